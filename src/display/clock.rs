use core::fmt;
use core::fmt::Write as _;

use heapless::String;
use log::info;

use super::{CharacterDisplay, DisplayError, LCD_COLS, LCD_ROWS};
use crate::node::interval::Interval;
use crate::node::{Publish, Tickable};

const REFRESH_MS: u64 = 1_000;

const START_YEAR: u32 = 2025;
const START_MONTH: u32 = 1;
const START_DAY: u32 = 15;
const START_SECONDS: u64 = 10 * 3_600 + 30 * 60;

const DAYS_PER_MONTH: u64 = 30;
const MONTHS_PER_YEAR: u64 = 12;

/// A calendar date and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    /// Year.
    pub year: u32,
    /// Month, 1..=12.
    pub month: u8,
    /// Day, 1..=30.
    pub day: u8,
    /// Hour, 0..=23.
    pub hour: u8,
    /// Minute, 0..=59.
    pub minute: u8,
    /// Second, 0..=59.
    pub second: u8,
}

impl DateTime {
    /// `DD/MM HH:MM:SS`, which fits one 16-column row.
    pub fn short(&self) -> String<16> {
        let mut text = String::new();
        let _ = write!(
            text,
            "{:02}/{:02} {:02}:{:02}:{:02}",
            self.day, self.month, self.hour, self.minute, self.second
        );
        text
    }
}

/// `DD/MM/YYYY HH:MM:SS`.
impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{} {:02}:{:02}:{:02}",
            self.day, self.month, self.year, self.hour, self.minute, self.second
        )
    }
}

/// Wall clock without an RTC.
///
/// Starts at 2025-01-15 10:30:00 and moves only when advanced. Months are
/// treated as 30 days long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulatedClock {
    elapsed_seconds: u64,
}

impl SimulatedClock {
    /// Clock at the start time.
    pub const fn new() -> Self {
        Self { elapsed_seconds: 0 }
    }

    /// Move the clock forward.
    pub fn advance(&mut self, seconds: u64) {
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(seconds);
    }

    /// Seconds since the start time.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Current date and time.
    pub fn now(&self) -> DateTime {
        let total = START_SECONDS.saturating_add(self.elapsed_seconds);
        let second = total % 60;
        let minutes = total / 60;
        let minute = minutes % 60;
        let hours = minutes / 60;
        let hour = hours % 24;
        let days = hours / 24;

        let day0 = u64::from(START_DAY - 1) + days;
        let month0 = u64::from(START_MONTH - 1) + day0 / DAYS_PER_MONTH;
        let years = month0 / MONTHS_PER_YEAR;

        DateTime {
            year: START_YEAR.saturating_add(u32::try_from(years).unwrap_or(u32::MAX)),
            month: (month0 % MONTHS_PER_YEAR + 1) as u8,
            day: (day0 % DAYS_PER_MONTH + 1) as u8,
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
        }
    }
}

/// Counter and simulated clock on a 16x2 display.
///
/// Every second the counter and clock advance together and both rows are
/// redrawn:
///
/// ```text
/// Count=42
/// 15/01 10:30:42
/// ```
#[derive(Debug)]
pub struct ClockDisplay<D: CharacterDisplay> {
    display: D,
    clock: SimulatedClock,
    refresh: Interval,
    counter: u32,
}

impl<D: CharacterDisplay> ClockDisplay<D> {
    /// Initialise `display` and show a splash line until the first refresh,
    /// one second after `now_ms`.
    ///
    /// A failed initialisation is fatal for the display; the caller decides
    /// whether to halt.
    pub fn start(mut display: D, now_ms: u64) -> Result<Self, DisplayError> {
        display.begin(LCD_COLS, LCD_ROWS)?;
        info!("LCD initialized");

        display.clear();
        display.set_cursor(0, 0);
        display.print("Initializing...");

        Ok(Self {
            display,
            clock: SimulatedClock::new(),
            refresh: Interval::starting_at(REFRESH_MS, now_ms),
            counter: 0,
        })
    }

    /// Refreshes so far.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// The simulated clock.
    pub fn clock(&self) -> &SimulatedClock {
        &self.clock
    }

    /// The underlying display.
    pub fn display(&self) -> &D {
        &self.display
    }

    fn render(&mut self) {
        let now = self.clock.now();

        let mut line: String<16> = String::new();
        let _ = write!(line, "Count={}", self.counter);

        self.display.clear();
        self.display.set_cursor(0, 0);
        self.display.print(&line);
        self.display.set_cursor(0, 1);
        self.display.print(&now.short());

        info!("Counter: {} | Date/Time: {}", self.counter, now);
    }
}

impl<D: CharacterDisplay> Tickable for ClockDisplay<D> {
    fn tick(&mut self, now_ms: u64, _out: &mut dyn Publish) {
        if !self.refresh.poll(now_ms) {
            return;
        }
        self.counter = self.counter.wrapping_add(1);
        self.clock.advance(1);
        self.render();
    }
}
