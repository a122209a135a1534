//! Hosted lab node.
//!
//! Runs the full loop against a real broker over TCP, with the board's
//! peripherals simulated: LEDs and the LCD are logged, the light sensor
//! follows a slow triangle wave and the button is pressed for 300 ms every
//! seven seconds. Configuration comes from `LABNODE_*` environment
//! variables, log filtering from `RUST_LOG`.

use std::process;

use env_logger::Builder;
use log::{LevelFilter, debug, error, info};

use labnode::display::{CharacterDisplay, ClockDisplay, DisplayError};
use labnode::hal::host::{StdClock, StdDelay};
use labnode::hal::{AnalogInput, Clock, InputPin, OutputPin};
use labnode::network::Station;
use labnode::network::application::mqtt::MqttSession;
use labnode::network::tcp::TcpNetwork;
use labnode::node::actuator::ActuatorBank;
use labnode::node::heartbeat::Heartbeat;
use labnode::node::router::TopicRouter;
use labnode::node::supervisor::ConnectionSupervisor;
use labnode::node::telemetry::TelemetryPublisher;
use labnode::{Config, Node, Tickable};

const LED_GPIOS: [u8; 4] = [26, 27, 14, 12];
const MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01];

/// The host network is always up.
struct HostStation;

impl Station for HostStation {
    fn is_associated(&mut self) -> bool {
        true
    }

    fn associate(&mut self, ssid: &str, _password: &str) {
        debug!("Host network stands in for {}", ssid);
    }

    fn mac_address(&self) -> [u8; 6] {
        MAC
    }
}

struct LoggedPin(u8);

impl OutputPin for LoggedPin {
    fn set_level(&mut self, high: bool) {
        debug!("GPIO {} {}", self.0, if high { "HIGH" } else { "LOW" });
    }
}

/// 12-bit light reading sweeping 0..=4095 and back every 20 s.
struct WaveSensor(StdClock);

impl AnalogInput for WaveSensor {
    fn read(&mut self) -> u16 {
        let phase = self.0.now_ms() % 20_000;
        let ramp = if phase < 10_000 { phase } else { 20_000 - phase };
        (ramp * 4095 / 10_000) as u16
    }
}

struct PeriodicButton(StdClock);

impl InputPin for PeriodicButton {
    fn is_high(&mut self) -> bool {
        self.0.now_ms() % 7_000 < 300
    }
}

#[derive(Default)]
struct ConsoleDisplay {
    row: u8,
}

impl CharacterDisplay for ConsoleDisplay {
    fn begin(&mut self, cols: u8, rows: u8) -> Result<(), DisplayError> {
        info!("Console LCD {}x{}", cols, rows);
        Ok(())
    }

    fn clear(&mut self) {
        self.row = 0;
    }

    fn set_cursor(&mut self, _col: u8, row: u8) {
        self.row = row;
    }

    fn print(&mut self, text: &str) {
        debug!("LCD row {}: {}", self.row, text);
    }
}

fn main() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("labnode"), LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("===== labnode =====");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Bad configuration: {}", e);
            process::exit(1);
        }
    };

    let clock = StdClock::new();

    let session = MqttSession::new(
        TcpNetwork::default(),
        &config.broker,
        config.timing.keep_alive_seconds,
    );
    let supervisor = ConnectionSupervisor::new(&config, HostStation, session, StdDelay);
    let router = match TopicRouter::new(&config) {
        Ok(router) => router,
        Err(e) => {
            error!("Cannot build routing table: {}", e);
            process::exit(1);
        }
    };
    let actuators = ActuatorBank::new(LED_GPIOS.map(LoggedPin));

    let mut telemetry = TelemetryPublisher::new(&config, WaveSensor(clock), PeriodicButton(clock));
    let mut heartbeat = Heartbeat::new(&config);
    let mut lcd = match ClockDisplay::start(ConsoleDisplay::default(), clock.now_ms()) {
        Ok(lcd) => lcd,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let mut node = Node::new(supervisor, router, actuators);
    let components: [&mut dyn Tickable; 3] = [&mut telemetry, &mut heartbeat, &mut lcd];
    for component in components {
        if let Err(e) = node.add(component) {
            error!("{}", e);
            process::exit(1);
        }
    }

    info!("Client id {}", node.supervisor().client_id());
    node.run(&clock)
}
