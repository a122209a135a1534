//! Character display support.
//!
//! The lab board carries an HD44780-compatible 16x2 LCD behind an I2C
//! expander. The node only needs four operations from it, captured by
//! [`CharacterDisplay`]; [`ClockDisplay`] renders a counter and a simulated
//! wall clock on it once per second.

mod clock;

pub use clock::{ClockDisplay, DateTime, SimulatedClock};

/// Columns on the lab display.
pub const LCD_COLS: u8 = 16;
/// Rows on the lab display.
pub const LCD_ROWS: u8 = 2;

/// Display errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// The controller did not initialise; carries the driver status code.
    Init(u8),
}

impl core::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DisplayError::Init(code) => write!(f, "display init failed (status {})", code),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DisplayError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            DisplayError::Init(code) => defmt::write!(f, "Init({=u8})", code),
        }
    }
}

/// A text-mode display.
pub trait CharacterDisplay {
    /// Initialise a display of `cols` x `rows` characters.
    fn begin(&mut self, cols: u8, rows: u8) -> Result<(), DisplayError>;
    /// Blank the display and home the cursor.
    fn clear(&mut self);
    /// Move the cursor; `row` 0 is the top line.
    fn set_cursor(&mut self, col: u8, row: u8);
    /// Write `text` at the cursor.
    fn print(&mut self, text: &str);
}

impl<T: CharacterDisplay + ?Sized> CharacterDisplay for &mut T {
    fn begin(&mut self, cols: u8, rows: u8) -> Result<(), DisplayError> {
        T::begin(self, cols, rows)
    }

    fn clear(&mut self) {
        T::clear(self)
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        T::set_cursor(self, col, row)
    }

    fn print(&mut self, text: &str) {
        T::print(self, text)
    }
}
