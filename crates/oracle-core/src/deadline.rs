//! Per-call time limits for gateway calls.

use std::future::Future;
use std::time::Duration;

use ledger_gateway::{GatewayError, GatewayResult};

/// Await `call`, giving up after `limit` when one is set.
pub(crate) async fn bounded<T, F>(limit: Option<Duration>, call: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(GatewayError::Timeout(limit))),
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, GatewayError>(1)
        };
        let err = bounded(Some(Duration::from_secs(1)), slow).await.unwrap_err();
        assert_eq!(err, GatewayError::Timeout(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn unbounded_call_passes_through() {
        let value = bounded(None, async { Ok::<_, GatewayError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
