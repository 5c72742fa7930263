//! Scripted session integration tests
//!
//! Runs the whole adapter against the simulated brokerage and checks what the
//! engine side observed.

use conduit_core::OrderStatus;
use conduit_runner::config::load_default_config;
use conduit_runner::{ScriptedSession, SessionBootstrap, SymbolMapping};
use rust_decimal_macros::dec;

#[tokio::test(start_paused = true)]
async fn test_default_session_runs() {
    let _ = env_logger::try_init();

    let bootstrap = SessionBootstrap::new().unwrap();
    let results = ScriptedSession::new(bootstrap).run().await;

    assert!(results.success, "session failed: {:?}", results.error);
    assert!(results.error.is_none());

    // Three symbols, one filled and one canceled order each
    assert_eq!(results.orders_placed, 6);
    assert_eq!(results.events(OrderStatus::Submitted), 6);
    assert_eq!(results.events(OrderStatus::PartiallyFilled), 3);
    assert_eq!(results.events(OrderStatus::Filled), 3);
    assert_eq!(results.events(OrderStatus::Canceled), 3);
    assert_eq!(results.events(OrderStatus::Invalid), 0);
    assert_eq!(results.total_fees, dec!(3.00));

    // A quote and a trade per symbol
    assert_eq!(results.ticks, 6);
    assert_eq!(results.open_orders, 0);
    assert_eq!(results.messages.first().map(String::as_str), Some("Connected"));
    assert_eq!(results.messages.last().map(String::as_str), Some("Disconnected"));
}

#[tokio::test]
async fn test_session_without_fee_delay() {
    let mut config = load_default_config().unwrap();
    config.brokerage.fee_settlement_delay_ms = 0;
    config.symbols = vec![SymbolMapping {
        symbol: "AAPL".to_string(),
        ticker: "AAPL.US".to_string(),
    }];
    config.session.quantity = dec!(-4);
    config.session.commission = dec!(0.5);

    let bootstrap = SessionBootstrap::with_config(config).unwrap();
    let results = ScriptedSession::new(bootstrap).run().await;

    assert!(results.success, "session failed: {:?}", results.error);
    assert_eq!(results.orders_placed, 2);
    assert_eq!(results.events(OrderStatus::Filled), 1);
    assert_eq!(results.events(OrderStatus::Canceled), 1);
    assert_eq!(results.total_fees, dec!(0.5));
}

#[tokio::test]
async fn test_failed_session_reports_error() {
    let bootstrap = SessionBootstrap::new().unwrap();
    bootstrap.simulator.fail_next_open_orders(
        conduit_gateway::TransportError::Connection("refused".to_string()),
    );

    let results = ScriptedSession::new(bootstrap).run().await;

    assert!(!results.success);
    assert!(results.error.is_some());
    assert_eq!(results.orders_placed, 0);
    assert!(results.messages.iter().any(|c| c == "OpenOrdersFailed"));
}
