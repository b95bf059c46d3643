use crate::system::{Error, MetricMode, Protocol, RoutingSystem};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Sets and restores per-interface route-preference metrics.
pub struct MetricController<'a, S> {
    system: &'a S,
}

impl<'a, S: RoutingSystem> MetricController<'a, S> {
    pub fn new(system: &'a S) -> Self {
        Self { system }
    }

    /// Pins an explicit persistent metric in two phases: clear any prior
    /// persistent override back to automatic, then set the value. Both
    /// phases must succeed; on failure the whole call is retried up to
    /// `max_retries` times without backoff.
    pub async fn set(&self, interface: &str, protocol: Protocol, value: u32, max_retries: u32) -> bool {
        for attempt in 1..=max_retries {
            match self.try_set(interface, protocol, value).await {
                Ok(()) => {
                    tracing::info!(%interface, %protocol, metric = value, "metric set");
                    return true;
                }
                Err(e) if attempt < max_retries => {
                    tracing::warn!(%interface, %protocol, attempt, error = %e, "metric set failed, retrying");
                }
                Err(e) => {
                    tracing::error!(%interface, %protocol, attempts = max_retries, error = %e, "metric set failed after all retries");
                }
            }
        }
        false
    }

    async fn try_set(&self, interface: &str, protocol: Protocol, value: u32) -> Result<(), Error> {
        self.system
            .set_metric(interface, protocol, MetricMode::Automatic)
            .await?;
        self.system
            .set_metric(interface, protocol, MetricMode::Value(value))
            .await
    }

    /// Restores automatic metrics for both protocol families. A failure on
    /// one family does not block the attempt on the other; failures are
    /// collected for the caller.
    pub async fn reset(&self, interface: &str) -> Vec<(Protocol, Error)> {
        let mut failures = Vec::new();
        for protocol in [Protocol::Ipv4, Protocol::Ipv6] {
            match self
                .system
                .set_metric(interface, protocol, MetricMode::Automatic)
                .await
            {
                Ok(()) => tracing::info!(%interface, %protocol, "metric restored to automatic"),
                Err(e) => {
                    tracing::warn!(%interface, %protocol, error = %e, "failed restoring automatic metric");
                    failures.push((protocol, e));
                }
            }
        }
        failures
    }
}
