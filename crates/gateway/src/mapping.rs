//! Translation between brokerage codes and domain enums
//!
//! Inbound codes are parsed into finite variants and mapped exhaustively.
//! There is no catch-all branch: a code the adapter does not know surfaces as
//! a [`ClassificationError`] so it can never be silently mis-categorised.

use conduit_core::{
    LocalOrder, OrderStatus, OrderType, OrderValidationError, Resolution, Side, TimeInForce,
};
use std::fmt;
use std::str::FromStr;

use crate::error::ClassificationError;
use crate::messages::{
    BrokerInterval, BrokerOrderType, BrokerSide, BrokerTimeInForce, PlaceOrderRequest,
};

/// Order status codes the brokerage reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerOrderStatus {
    Pending,
    Placing,
    Working,
    Filled,
    Cancelled,
    Rejected,
}

impl BrokerOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Placing => "placing",
            Self::Working => "working",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Brokerage will send no further updates for this id
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }
}

impl fmt::Display for BrokerOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrokerOrderStatus {
    type Err = ClassificationError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim().to_ascii_lowercase().as_str() {
            "" => Err(ClassificationError::MissingStatus),
            "pending" => Ok(Self::Pending),
            "placing" => Ok(Self::Placing),
            "working" => Ok(Self::Working),
            "filled" => Ok(Self::Filled),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ClassificationError::UnknownStatus(code.to_string())),
        }
    }
}

impl From<BrokerOrderStatus> for OrderStatus {
    fn from(status: BrokerOrderStatus) -> Self {
        match status {
            BrokerOrderStatus::Pending => OrderStatus::Submitted,
            BrokerOrderStatus::Placing | BrokerOrderStatus::Working => {
                OrderStatus::PartiallyFilled
            }
            BrokerOrderStatus::Filled => OrderStatus::Filled,
            BrokerOrderStatus::Cancelled => OrderStatus::Canceled,
            BrokerOrderStatus::Rejected => OrderStatus::Invalid,
        }
    }
}

/// Classify a raw status code into the domain status
pub fn classify_status(code: &str) -> Result<OrderStatus, ClassificationError> {
    code.parse::<BrokerOrderStatus>().map(OrderStatus::from)
}

pub fn parse_side(code: &str) -> Result<Side, ClassificationError> {
    match code.trim().to_ascii_lowercase().as_str() {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        _ => Err(ClassificationError::UnknownSide(code.to_string())),
    }
}

pub fn parse_order_type(code: &str) -> Result<OrderType, ClassificationError> {
    match code.trim().to_ascii_lowercase().as_str() {
        "market" => Ok(OrderType::Market),
        "limit" => Ok(OrderType::Limit),
        "stop" => Ok(OrderType::StopMarket),
        "stop_limit" => Ok(OrderType::StopLimit),
        _ => Err(ClassificationError::UnknownOrderType(code.to_string())),
    }
}

/// Time in force of an inbound record; unknown codes fall back to GTC since
/// the field does not affect reconciliation
pub fn parse_time_in_force(code: &str) -> TimeInForce {
    match code.trim().to_ascii_lowercase().as_str() {
        "day" => TimeInForce::Day,
        "ioc" => TimeInForce::ImmediateOrCancel,
        "fok" => TimeInForce::FillOrKill,
        _ => TimeInForce::GoodTilCanceled,
    }
}

pub fn to_broker_side(side: Side) -> BrokerSide {
    match side {
        Side::Buy => BrokerSide::Buy,
        Side::Sell => BrokerSide::Sell,
    }
}

pub fn to_broker_order_type(order_type: OrderType) -> BrokerOrderType {
    match order_type {
        OrderType::Market => BrokerOrderType::Market,
        OrderType::Limit => BrokerOrderType::Limit,
        OrderType::StopMarket => BrokerOrderType::Stop,
        OrderType::StopLimit => BrokerOrderType::StopLimit,
    }
}

pub fn to_broker_time_in_force(
    time_in_force: &TimeInForce,
) -> Result<BrokerTimeInForce, OrderValidationError> {
    match time_in_force {
        TimeInForce::Day => Ok(BrokerTimeInForce::Day),
        TimeInForce::GoodTilCanceled => Ok(BrokerTimeInForce::Gtc),
        TimeInForce::ImmediateOrCancel => Ok(BrokerTimeInForce::Ioc),
        TimeInForce::FillOrKill => Ok(BrokerTimeInForce::Fok),
        TimeInForce::GoodTilDate(expiry) => Err(OrderValidationError::UnsupportedTimeInForce(
            format!("good-til-date ({expiry})"),
        )),
    }
}

pub fn to_broker_interval(resolution: Resolution) -> Result<BrokerInterval, OrderValidationError> {
    match resolution {
        Resolution::Minute => Ok(BrokerInterval::Minute),
        Resolution::Hour => Ok(BrokerInterval::Hour),
        Resolution::Daily => Ok(BrokerInterval::Day),
        Resolution::Tick | Resolution::Second => Err(
            OrderValidationError::UnsupportedResolution(resolution.to_string()),
        ),
    }
}

/// Build the wire request for placing (or replacing) `order` under `ticker`
pub fn place_request_for(
    order: &LocalOrder,
    ticker: &str,
) -> Result<PlaceOrderRequest, OrderValidationError> {
    order.validate()?;
    Ok(PlaceOrderRequest {
        client_order_id: order.id.to_string(),
        ticker: ticker.to_string(),
        side: to_broker_side(order.side()),
        quantity: order.abs_quantity(),
        order_type: to_broker_order_type(order.order_type),
        limit_price: order.limit_price,
        stop_price: order.stop_price,
        time_in_force: to_broker_time_in_force(&order.time_in_force)?,
    })
}
