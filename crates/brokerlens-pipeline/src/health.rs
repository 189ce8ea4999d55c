use std::time::Duration;

use brokerlens_broker::{BrokerAdapter, HealthStatus};
use tracing::warn;

/// Probe broker health, giving up after `timeout` when one is given.
///
/// Never fails: an adapter error or an expired deadline is reported as an
/// `unreachable` status.
pub async fn check_health(adapter: &dyn BrokerAdapter, timeout: Option<Duration>) -> HealthStatus {
    let probe = adapter.check_health();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, probe).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(broker = adapter.broker_name(), timeout = ?limit, "health check timed out");
                return HealthStatus::unreachable(format!(
                    "health check timed out after {limit:?}"
                ));
            }
        },
        None => probe.await,
    };

    outcome.unwrap_or_else(|err| {
        warn!(broker = adapter.broker_name(), error = %err, "health check failed");
        HealthStatus::unreachable(err.to_string())
    })
}
