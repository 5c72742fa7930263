//! Cancellation and timeout for brokerage calls

use conduit_gateway::{TransportError, TransportResult};
use log::warn;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Races every brokerage call against a shared cancellation token and an
/// optional timeout. Aborted calls report failure; nothing is retried here.
pub struct RpcGuard {
    token: Mutex<CancellationToken>,
    timeout: Option<Duration>,
}

impl RpcGuard {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            token: Mutex::new(CancellationToken::new()),
            timeout,
        }
    }

    /// Run `call`, giving up on cancellation or timeout
    pub async fn run<T, F>(&self, operation: &str, call: F) -> TransportResult<T>
    where
        F: Future<Output = TransportResult<T>>,
    {
        let token = self.token.lock().clone();

        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or(Err(TransportError::Timeout)),
                None => call.await,
            }
        };

        let result = tokio::select! {
            () = token.cancelled() => Err(TransportError::Cancelled),
            result = bounded => result,
        };

        if let Err(e) = &result
            && e.is_aborted()
        {
            warn!("{} abandoned: {}", operation, e);
        }
        result
    }

    /// Cancel every call currently in flight; later calls run normally
    pub fn abort_in_flight(&self) {
        let mut token = self.token.lock();
        token.cancel();
        *token = CancellationToken::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_passes_through_result() {
        let guard = RpcGuard::new(None);
        let ok = guard.run("op", async { Ok::<_, TransportError>(5) }).await;
        assert_eq!(ok, Ok(5));

        let err: TransportResult<()> = guard
            .run("op", async { Err(TransportError::api(503, "busy")) })
            .await;
        assert_eq!(err.unwrap_err().status_code(), Some(503));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let guard = RpcGuard::new(Some(Duration::from_millis(50)));
        let slow = guard
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(slow, Err(TransportError::Timeout));
    }

    #[tokio::test]
    async fn test_abort_only_hits_in_flight_calls() {
        let guard = Arc::new(RpcGuard::new(None));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();

        let pending = {
            let guard = Arc::clone(&guard);
            tokio::spawn(async move {
                guard
                    .run("hang", async move {
                        let _ = started_tx.send(());
                        std::future::pending::<TransportResult<()>>().await
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        guard.abort_in_flight();
        assert_eq!(pending.await.unwrap(), Err(TransportError::Cancelled));

        let after = guard.run("next", async { Ok::<_, TransportError>(1) }).await;
        assert_eq!(after, Ok(1));
    }
}
