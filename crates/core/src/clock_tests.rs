use super::*;

#[test]
fn fake_clock_advances_both_instant_and_epoch() {
    let clock = FakeClock::new();
    let start = clock.now();
    let start_epoch = clock.epoch_ms();

    clock.advance(Duration::from_millis(250));

    assert_eq!(clock.now(), start + Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), start_epoch + 250);
}

#[test]
fn fake_clock_set_epoch_ms_is_absolute() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}

#[test]
fn system_clock_epoch_ms_is_plausible() {
    let clock = SystemClock;
    // Should be well after 2020-01-01 in epoch millis.
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}
