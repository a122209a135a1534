mod common;

use common::*;
use labnode::Tickable;
use labnode::display::{ClockDisplay, DisplayError, SimulatedClock};

#[test]
fn test_start_initialises_16x2() {
    let lcd = ClockDisplay::start(MockDisplay::default(), 0).unwrap();
    let display = lcd.display();
    assert_eq!(display.size, Some((16, 2)));
    assert_eq!(display.rows[0], "Initializing...");
    assert_eq!(lcd.counter(), 0);
}

#[test]
fn test_start_failure_is_reported() {
    let display = MockDisplay {
        fail_with: Some(2),
        ..Default::default()
    };
    assert_eq!(
        ClockDisplay::start(display, 0).err().map(|e| e.to_string()),
        Some("display init failed (status 2)".to_string())
    );
    assert_eq!(
        ClockDisplay::start(
            MockDisplay {
                fail_with: Some(7),
                ..Default::default()
            },
            0
        )
        .err(),
        Some(DisplayError::Init(7))
    );
}

#[test]
fn test_refreshes_once_per_second() {
    let mut lcd = ClockDisplay::start(MockDisplay::default(), 500).unwrap();
    let mut out = RecordingPublisher::default();

    lcd.tick(1_000, &mut out);
    assert_eq!(lcd.counter(), 0);
    assert_eq!(lcd.display().rows[0], "Initializing...");

    lcd.tick(1_500, &mut out);
    assert_eq!(lcd.display().rows, ["Count=1", "15/01 10:30:01"]);

    lcd.tick(2_100, &mut out);
    lcd.tick(2_500, &mut out);
    assert_eq!(lcd.display().rows, ["Count=2", "15/01 10:30:02"]);
    assert_eq!(lcd.clock().elapsed_seconds(), 2);

    // Rendering never publishes.
    assert!(out.messages.is_empty());
}

#[test]
fn test_each_refresh_clears_first() {
    let mut lcd = ClockDisplay::start(MockDisplay::default(), 0).unwrap();
    let mut out = RecordingPublisher::default();
    let clears = lcd.display().clears;

    for second in 1..=12 {
        lcd.tick(second * 1_000, &mut out);
    }

    assert_eq!(lcd.display().clears, clears + 12);
    assert_eq!(lcd.display().rows, ["Count=12", "15/01 10:30:12"]);
}

#[test]
fn test_clock_long_run() {
    let mut clock = SimulatedClock::new();
    clock.advance(29 * 60 + 59);
    assert_eq!(clock.now().short().as_str(), "15/01 10:59:59");
    assert_eq!(clock.now().to_string(), "15/01/2025 10:59:59");

    clock.advance(1);
    assert_eq!(clock.now().to_string(), "15/01/2025 11:00:00");

    // 365 days at 30 days per month is a year and five days.
    let mut clock = SimulatedClock::new();
    clock.advance(365 * 24 * 3_600);
    assert_eq!(clock.now().to_string(), "20/01/2026 10:30:00");
}
