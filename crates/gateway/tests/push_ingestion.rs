//! Integration test: SimulatedBrokerage push stream -> ingestion channel
//!
//! Tests the receive path the reconciliation consumer sits behind:
//! Brokerage RPC -> push callback -> IngestionSender -> IngestionReceiver

use conduit_core::OrderStatus;
use conduit_gateway::{
    BrokerSide, BrokerTimeInForce, BrokerageTransport, ClassificationError, OrderUpdateMessage,
    PlaceOrderRequest, SimulatedBrokerage, ingestion_channel, mapping::classify_status,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn limit_buy(client_id: &str) -> PlaceOrderRequest {
    PlaceOrderRequest::limit(
        client_id,
        "AAPL.US",
        BrokerSide::Buy,
        dec!(10),
        dec!(100),
        BrokerTimeInForce::Gtc,
    )
}

async fn connected() -> (
    SimulatedBrokerage,
    conduit_gateway::IngestionReceiver<OrderUpdateMessage>,
) {
    let sim = SimulatedBrokerage::new();
    let (tx, rx) = ingestion_channel::<OrderUpdateMessage>();
    sim.register_order_updates(Arc::new(move |update| {
        let _ = tx.push(update);
    }))
    .await
    .expect("register");
    (sim, rx)
}

#[tokio::test]
async fn test_lifecycle_arrives_in_order() {
    let _ = env_logger::try_init();
    let (sim, mut rx) = connected().await;

    let records = sim.place_order(limit_buy("c-1")).await.unwrap();
    let id = records[0].order_id.clone();
    sim.work(&id, dec!(3)).unwrap();
    sim.fill(&id, dec!(99.75)).unwrap();

    let mut domain = Vec::new();
    while let Ok(Some(update)) = rx.try_next() {
        assert_eq!(update.order_id, id);
        domain.push(classify_status(&update.status).unwrap());
        rx.mark_forwarded();
    }

    assert_eq!(
        domain,
        vec![
            OrderStatus::Submitted,
            OrderStatus::PartiallyFilled,
            OrderStatus::Filled
        ]
    );
    assert_eq!(rx.stats().in_flight(), 0);
}

#[tokio::test]
async fn test_raw_frames_and_unknown_codes() {
    let _ = env_logger::try_init();
    let (sim, mut rx) = connected().await;

    let delivered = sim
        .push_frame(
            r#"{"order_id":"EXT-1","ticker":"AAPL.US","status":"expired","timestamp":"2024-03-01T14:30:00Z"}"#,
        )
        .unwrap();
    assert!(delivered);
    assert!(sim.push_frame("garbage").is_err());

    let update = rx.next().await.unwrap();
    assert_eq!(update.order_id, "EXT-1");
    assert_eq!(
        classify_status(&update.status),
        Err(ClassificationError::UnknownStatus("expired".to_string()))
    );
    assert_eq!(rx.try_next(), Ok(None));
}

#[tokio::test]
async fn test_no_pushes_after_listener_cleared() {
    let _ = env_logger::try_init();
    let (sim, mut rx) = connected().await;

    sim.clear_order_updates().await;
    assert!(!sim.has_order_listener());

    sim.place_order(limit_buy("c-2")).await.unwrap();
    // The dropped callback owned the only sender
    assert!(!matches!(rx.try_next(), Ok(Some(_))));
    assert_eq!(rx.next().await, None);
}
