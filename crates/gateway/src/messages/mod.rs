//! Wire message types exchanged with the brokerage
//!
//! Status, side and order-type codes on inbound messages stay as raw strings
//! here; [`crate::mapping`] turns them into domain enums.

pub mod market_data;
pub mod order;

pub use market_data::{
    BrokerCandle, BrokerCash, BrokerInterval, BrokerPosition, CandleRequest, QuoteMessage,
    TradeMessage,
};
pub use order::{
    BrokerOrderRecord, BrokerOrderType, BrokerSide, BrokerTimeInForce, OrderUpdateMessage,
    PlaceOrderRequest, Transaction,
};
