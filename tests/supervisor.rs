mod common;

use common::*;
use labnode::node::Error;
use labnode::node::config::Config;
use labnode::node::retry::{Backoff, FixedDelay};
use labnode::node::supervisor::{ConnectionState, ConnectionSupervisor};

#[test]
fn test_client_id_from_mac() {
    let config = Config::lab().unwrap();
    let supervisor = ConnectionSupervisor::new(
        &config,
        MockStation::associated(),
        MockBroker::default(),
        MockDelay::default(),
    );
    assert_eq!(supervisor.client_id(), "esp32-client-24:0A:C4:12:34:56");
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
}

#[test]
fn test_joins_wifi_then_broker() {
    let config = Config::lab().unwrap();
    let delay = MockDelay::default();
    let mut supervisor = ConnectionSupervisor::new(
        &config,
        MockStation::joins_after(3),
        MockBroker::default(),
        delay.clone(),
    );

    supervisor.ensure_connected().unwrap();

    assert_eq!(supervisor.state(), ConnectionState::Connected);
    assert_eq!(
        supervisor.station().joins,
        vec![("Wokwi-GUEST".to_string(), String::new())]
    );
    assert_eq!(delay.sleeps(), vec![500, 500, 500]);

    let broker = supervisor.broker();
    assert_eq!(
        broker.events[0],
        BrokerEvent::Connect("esp32-client-24:0A:C4:12:34:56".to_string())
    );
    let credentials = broker.credentials.as_ref().unwrap();
    assert_eq!(credentials.username.as_str(), "userTTPU");
    assert_eq!(credentials.password.as_str(), "mqttpass");
}

#[test]
fn test_subscribes_every_led_topic() {
    let config = Config::lab().unwrap();
    let mut supervisor = ConnectionSupervisor::new(
        &config,
        MockStation::associated(),
        MockBroker::default(),
        MockDelay::default(),
    );

    supervisor.ensure_connected().unwrap();

    assert_eq!(
        supervisor.broker().subscriptions(),
        vec![
            "ttpu/iot/maqsud/led/red",
            "ttpu/iot/maqsud/led/green",
            "ttpu/iot/maqsud/led/blue",
            "ttpu/iot/maqsud/led/yellow",
        ]
    );
}

#[test]
fn test_retries_broker_with_fixed_delay() {
    let config = Config::lab().unwrap();
    let delay = MockDelay::default();
    let mut supervisor = ConnectionSupervisor::new(
        &config,
        MockStation::associated(),
        MockBroker::failing(2),
        delay.clone(),
    );

    supervisor.ensure_connected().unwrap();

    assert_eq!(supervisor.broker().connect_attempts, 3);
    assert_eq!(delay.sleeps(), vec![5_000, 5_000]);
    assert_eq!(supervisor.state(), ConnectionState::Connected);
}

#[test]
fn test_ensure_connected_is_idempotent() {
    let config = Config::lab().unwrap();
    let delay = MockDelay::default();
    let mut supervisor = ConnectionSupervisor::new(
        &config,
        MockStation::associated(),
        MockBroker::default(),
        delay.clone(),
    );

    supervisor.ensure_connected().unwrap();
    let events = supervisor.broker().events.len();
    supervisor.ensure_connected().unwrap();
    supervisor.ensure_connected().unwrap();

    assert_eq!(supervisor.broker().connect_attempts, 1);
    assert_eq!(supervisor.broker().events.len(), events);
    assert!(delay.sleeps().is_empty());
}

#[test]
fn test_reconnect_resubscribes() {
    let config = Config::lab().unwrap();
    let mut supervisor = ConnectionSupervisor::new(
        &config,
        MockStation::associated(),
        MockBroker::default(),
        MockDelay::default(),
    );

    supervisor.ensure_connected().unwrap();
    supervisor.broker_mut().drop_link();
    supervisor.ensure_connected().unwrap();

    let broker = supervisor.broker();
    assert_eq!(broker.connect_attempts, 2);
    let subscriptions = broker.subscriptions();
    assert_eq!(subscriptions.len(), 8);
    assert_eq!(subscriptions[..4], subscriptions[4..]);
}

#[test]
fn test_subscribe_failure_keeps_session() {
    let config = Config::lab().unwrap();
    let broker = MockBroker {
        refuse_subscribe: true,
        ..MockBroker::default()
    };
    let mut supervisor = ConnectionSupervisor::new(
        &config,
        MockStation::associated(),
        broker,
        MockDelay::default(),
    );

    assert_eq!(supervisor.ensure_connected(), Ok(()));
    assert_eq!(supervisor.state(), ConnectionState::Connected);
    assert!(supervisor.broker().subscriptions().is_empty());
}

#[test]
fn test_bounded_policy_gives_up_on_broker() {
    let config = Config::lab().unwrap();
    let delay = MockDelay::default();
    let policy = FixedDelay::new(100).with_max_attempts(3);
    let mut supervisor = ConnectionSupervisor::with_retry(
        &config,
        MockStation::associated(),
        MockBroker::failing(usize::MAX),
        delay.clone(),
        policy,
        policy,
    );

    assert_eq!(supervisor.ensure_connected(), Err(Error::RetriesExhausted));
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    assert_eq!(supervisor.broker().connect_attempts, 3);
    assert_eq!(delay.sleeps(), vec![100, 100]);
}

#[test]
fn test_bounded_policy_gives_up_on_wifi() {
    let config = Config::lab().unwrap();
    let policy = FixedDelay::new(100).with_max_attempts(2);
    let mut supervisor = ConnectionSupervisor::with_retry(
        &config,
        MockStation::joins_after(10),
        MockBroker::default(),
        MockDelay::default(),
        policy,
        policy,
    );

    assert_eq!(supervisor.ensure_connected(), Err(Error::RetriesExhausted));
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    assert_eq!(supervisor.broker().connect_attempts, 0);
}

#[test]
fn test_backoff_policy_doubles() {
    let config = Config::lab().unwrap();
    let delay = MockDelay::default();
    let mut supervisor = ConnectionSupervisor::with_retry(
        &config,
        MockStation::associated(),
        MockBroker::failing(4),
        delay.clone(),
        Backoff::new(1_000, 30_000),
        Backoff::new(1_000, 30_000),
    );

    supervisor.ensure_connected().unwrap();
    assert_eq!(delay.sleeps(), vec![1_000, 2_000, 4_000, 8_000]);
}

#[test]
fn test_policy_restarts_after_success() {
    let config = Config::lab().unwrap();
    let delay = MockDelay::default();
    let mut supervisor = ConnectionSupervisor::with_retry(
        &config,
        MockStation::associated(),
        MockBroker::failing(2),
        delay.clone(),
        Backoff::new(1_000, 30_000),
        Backoff::new(1_000, 30_000),
    );

    supervisor.ensure_connected().unwrap();
    supervisor.broker_mut().drop_link();
    supervisor.broker_mut().failures_left = 1;
    supervisor.ensure_connected().unwrap();

    assert_eq!(delay.sleeps(), vec![1_000, 2_000, 1_000]);
}
