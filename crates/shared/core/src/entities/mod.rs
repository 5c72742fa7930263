mod account;
mod market_data;
mod message;
mod order;
mod order_event;
mod order_status;
mod order_type;
mod side;
mod time_in_force;

pub use account::{CashAmount, Holding};
pub use market_data::{Bar, HistoryRequest, QuoteTick, Resolution, Tick, TradeTick};
pub use message::{BrokerageMessage, MessageKind};
pub use order::{LocalOrder, OrderId, OrderRef, OrderValidationError};
pub use order_event::{OrderEvent, OrderFee};
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use side::Side;
pub use time_in_force::TimeInForce;
