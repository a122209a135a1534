//! Peripheral capabilities.
//!
//! The core only needs a handful of operations from the board: digital
//! outputs for the LEDs, a digital input for the button, one analog channel
//! for the light sensor, a millisecond clock and a blocking delay. Firmware
//! implements these on top of its HAL; tests implement them with plain
//! structs.

#[cfg(feature = "std")]
pub mod host;

/// A digital output, e.g. an LED.
pub trait OutputPin {
    /// Drive the output high (`true`) or low (`false`).
    fn set_level(&mut self, high: bool);
}

/// A digital input, e.g. an active-high push button.
pub trait InputPin {
    /// Current raw level of the input.
    fn is_high(&mut self) -> bool;
}

/// A single analog input channel.
pub trait AnalogInput {
    /// Take one raw sample (12-bit on the ESP32).
    fn read(&mut self) -> u16;
}

/// Monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin (usually boot).
    fn now_ms(&self) -> u64;
}

/// Blocking delay.
pub trait Delay {
    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

impl<T: OutputPin + ?Sized> OutputPin for &mut T {
    fn set_level(&mut self, high: bool) {
        (**self).set_level(high)
    }
}

impl<T: InputPin + ?Sized> InputPin for &mut T {
    fn is_high(&mut self) -> bool {
        (**self).is_high()
    }
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    fn read(&mut self) -> u16 {
        (**self).read()
    }
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
