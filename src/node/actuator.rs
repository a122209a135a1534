//! LED outputs.

use log::info;

use super::router::Command;
use crate::hal::OutputPin;

/// The four LED channels on the lab board.
///
/// Lab wiring: red on GPIO 26, green on 27, blue on 14, yellow on 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorId {
    /// Red LED.
    Red,
    /// Green LED.
    Green,
    /// Blue LED.
    Blue,
    /// Yellow LED.
    Yellow,
}

impl ActuatorId {
    /// Number of channels.
    pub const COUNT: usize = 4;

    /// Every channel, in index order.
    pub const ALL: [ActuatorId; Self::COUNT] = [
        ActuatorId::Red,
        ActuatorId::Green,
        ActuatorId::Blue,
        ActuatorId::Yellow,
    ];

    /// Position of this channel in per-channel arrays.
    pub const fn index(self) -> usize {
        match self {
            ActuatorId::Red => 0,
            ActuatorId::Green => 1,
            ActuatorId::Blue => 2,
            ActuatorId::Yellow => 3,
        }
    }

    /// Lowercase color name, also the last topic level.
    pub const fn name(self) -> &'static str {
        match self {
            ActuatorId::Red => "red",
            ActuatorId::Green => "green",
            ActuatorId::Blue => "blue",
            ActuatorId::Yellow => "yellow",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ActuatorId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.name())
    }
}

/// Output pins for every [`ActuatorId`].
///
/// All outputs are driven low when the bank is created. The bank remembers
/// the last level it applied per channel.
#[derive(Debug)]
pub struct ActuatorBank<P: OutputPin> {
    pins: [P; ActuatorId::COUNT],
    levels: [bool; ActuatorId::COUNT],
}

impl<P: OutputPin> ActuatorBank<P> {
    /// Take ownership of the pins, ordered as [`ActuatorId::ALL`], and turn
    /// every output off.
    pub fn new(mut pins: [P; ActuatorId::COUNT]) -> Self {
        for pin in pins.iter_mut() {
            pin.set_level(false);
        }
        Self {
            pins,
            levels: [false; ActuatorId::COUNT],
        }
    }

    /// Drive the output named by `command`.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetActuator { id, on } => {
                self.pins[id.index()].set_level(on);
                self.levels[id.index()] = on;
                info!("LED {} {}", id.name(), if on { "on" } else { "off" });
            }
        }
    }

    /// Last level applied to `id`.
    pub fn level(&self, id: ActuatorId) -> bool {
        self.levels[id.index()]
    }

    /// The pin driving `id`.
    pub fn pin(&self, id: ActuatorId) -> &P {
        &self.pins[id.index()]
    }
}
