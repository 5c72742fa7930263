use serde::{Deserialize, Serialize};

/// Order lifecycle status as the engine sees it.
///
/// Statuses advance monotonically:
/// `New → Submitted → PartiallyFilled* → {Filled, Canceled, Invalid}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Order has been created by the engine but not yet sent
    New,
    /// Order has been accepted by the brokerage
    Submitted,
    /// Order is working at the brokerage and may have been partially filled
    PartiallyFilled,
    /// Order has been completely filled
    Filled,
    /// Order has been canceled
    Canceled,
    /// Order was rejected or could not be placed
    Invalid,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Invalid
        )
    }

    /// Returns true if the order is still active
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Submitted | OrderStatus::PartiallyFilled)
    }

    /// Position in the lifecycle ordering; all terminal states share the top rank
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::Submitted => 1,
            OrderStatus::PartiallyFilled => 2,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Invalid => 3,
        }
    }

    /// Whether moving from `self` to `next` is a meaningful forward transition.
    ///
    /// Terminal states never move. Repeating `PartiallyFilled` is allowed since
    /// each working update may carry new fill progress; any other repeat is a
    /// duplicate.
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return next == OrderStatus::PartiallyFilled;
        }
        next.rank() > self.rank()
    }
}
