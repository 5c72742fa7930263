use conduit_core::OrderFee;
use conduit_gateway::BrokerageTransport;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::guard::RpcGuard;

/// Looks up the commission charged for a filled brokerage order.
///
/// Fee postings lag fill confirmation, so the lookup waits a fixed settlement
/// delay first. A lookup that fails, or finds nothing yet, resolves to a zero
/// fee: the fill event must go out regardless.
pub struct FeeResolver {
    transport: Arc<dyn BrokerageTransport>,
    guard: Arc<RpcGuard>,
    currency: String,
    settlement_delay: Duration,
}

impl FeeResolver {
    pub fn new(
        transport: Arc<dyn BrokerageTransport>,
        guard: Arc<RpcGuard>,
        currency: impl Into<String>,
        settlement_delay: Duration,
    ) -> Self {
        Self {
            transport,
            guard,
            currency: currency.into(),
            settlement_delay,
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub async fn resolve(&self, broker_id: &str) -> OrderFee {
        if !self.settlement_delay.is_zero() {
            tokio::time::sleep(self.settlement_delay).await;
        }

        let postings = match self
            .guard
            .run("transactions", self.transport.transactions(broker_id))
            .await
        {
            Ok(postings) => postings,
            Err(e) => {
                warn!("Fee lookup for {} failed, using zero fee: {}", broker_id, e);
                return OrderFee::zero(&self.currency);
            }
        };

        let amount: Decimal = postings
            .iter()
            .filter(|p| p.is_fee() && p.currency.eq_ignore_ascii_case(&self.currency))
            .map(|p| p.amount.abs())
            .sum();

        if amount.is_zero() {
            warn!("No fee postings yet for {}, using zero fee", broker_id);
        } else {
            debug!("Fee for {}: {} {}", broker_id, amount, self.currency);
        }
        OrderFee::new(amount, &self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use conduit_gateway::{SimulatedBrokerage, TransportError, Transaction};
    use rust_decimal_macros::dec;

    fn resolver(sim: &SimulatedBrokerage) -> FeeResolver {
        FeeResolver::new(
            Arc::new(sim.clone()),
            Arc::new(RpcGuard::new(None)),
            "USD",
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_sums_fee_postings_in_account_currency() {
        let sim = SimulatedBrokerage::new();
        sim.add_fee("B-1", dec!(1.25), "USD");
        sim.add_fee("B-1", dec!(0.75), "USD");
        sim.add_fee("B-1", dec!(9), "EUR");
        sim.add_transaction(Transaction {
            order_id: "B-1".to_string(),
            kind: "trade".to_string(),
            amount: dec!(-1000),
            currency: "USD".to_string(),
            timestamp: Utc::now(),
        });

        let fee = resolver(&sim).resolve("B-1").await;
        assert_eq!(fee, OrderFee::new(dec!(2.00), "USD"));
    }

    #[tokio::test]
    async fn test_missing_postings_degrade_to_zero() {
        let sim = SimulatedBrokerage::new();
        let fee = resolver(&sim).resolve("B-404").await;
        assert!(fee.is_zero());
        assert_eq!(fee.currency, "USD");
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_zero() {
        let sim = SimulatedBrokerage::new();
        sim.add_fee("B-1", dec!(1), "USD");
        sim.fail_next_transactions(TransportError::Connection("reset".to_string()));

        assert!(resolver(&sim).resolve("B-1").await.is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_settlement_delay() {
        let sim = SimulatedBrokerage::new();
        let resolver = FeeResolver::new(
            Arc::new(sim),
            Arc::new(RpcGuard::new(None)),
            "USD",
            Duration::from_secs(2),
        );

        let started = tokio::time::Instant::now();
        resolver.resolve("B-1").await;
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
