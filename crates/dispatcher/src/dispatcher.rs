//! Fan-Out Dispatcher - one wave of concurrent outbound calls

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, debug_span, error, info, instrument, warn, Instrument};

use contracts::{
    Destination, DispatchConfig, DispatchFailure, DispatchOutcome, HttpTransport, InboundPayload,
    OutboundRequest, StatusPolicy,
};

use crate::adapter::adapt;
use crate::metrics::DispatchMetrics;

/// Dispatcher configuration
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Per outbound call timeout
    pub timeout: Duration,
    /// How completed exchanges are counted by the aggregator
    pub status_policy: StatusPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatcherConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            timeout: config.timeout(),
            status_policy: config.status_policy,
        }
    }
}

/// Issues every adapted request of a wave concurrently.
///
/// Each destination gets its own task and its own timeout. A failing or
/// panicking unit only affects its own outcome; nothing is cancelled across
/// destinations. `dispatch` returns once every unit has settled.
pub struct FanOutDispatcher<T> {
    transport: Arc<T>,
    config: DispatcherConfig,
    metrics: Arc<DispatchMetrics>,
}

impl<T> FanOutDispatcher<T>
where
    T: HttpTransport + Send + Sync + 'static,
{
    pub fn new(transport: T, config: DispatcherConfig) -> Self {
        Self::with_shared(Arc::new(transport), config)
    }

    /// Build over a transport that is shared elsewhere
    pub fn with_shared(transport: Arc<T>, config: DispatcherConfig) -> Self {
        Self {
            transport,
            config,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.config.status_policy
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Run one dispatch wave.
    ///
    /// Returns exactly one outcome per destination, in input order.
    #[instrument(
        name = "dispatch_wave",
        skip_all,
        fields(destinations = destinations.len(), transport = self.transport.name())
    )]
    pub async fn dispatch(
        &self,
        destinations: &[Destination],
        payload: &InboundPayload,
    ) -> Vec<DispatchOutcome> {
        self.metrics.inc_waves();
        observability::record_wave_size(destinations.len());

        let mut slots: Vec<Option<DispatchOutcome>> = vec![None; destinations.len()];
        let mut units = JoinSet::new();

        for (index, destination) in destinations.iter().enumerate() {
            match adapt(destination, payload) {
                Ok(request) => {
                    let span = debug_span!(
                        "dispatch_unit",
                        destination_id = %destination.id,
                        method = %request.method
                    );
                    let transport = Arc::clone(&self.transport);
                    let timeout = self.config.timeout;
                    units.spawn(
                        async move {
                            let started = Instant::now();
                            let outcome = run_unit(transport.as_ref(), request, timeout).await;
                            (index, started.elapsed(), outcome)
                        }
                        .instrument(span),
                    );
                }
                Err(failure) => {
                    warn!(
                        destination_id = %destination.id,
                        error = %failure,
                        "Request adaptation failed, destination skipped"
                    );
                    slots[index] = Some(DispatchOutcome::failed(destination.id, failure));
                }
            }
        }

        // Join barrier: the wave settles only when every unit has
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((index, elapsed, outcome)) => {
                    observability::record_dispatch_latency_ms(elapsed.as_secs_f64() * 1000.0);
                    slots[index] = Some(outcome);
                }
                // the slot stays empty and is filled below
                Err(e) => error!(error = %e, "Dispatch unit aborted"),
            }
        }

        let outcomes: Vec<DispatchOutcome> = slots
            .into_iter()
            .zip(destinations)
            .map(|(slot, destination)| {
                slot.unwrap_or_else(|| {
                    DispatchOutcome::failed(
                        destination.id,
                        DispatchFailure::Aborted {
                            message: "dispatch unit panicked before settling".to_string(),
                        },
                    )
                })
            })
            .collect();

        self.record(destinations, &outcomes);
        outcomes
    }

    fn record(&self, destinations: &[Destination], outcomes: &[DispatchOutcome]) {
        for (destination, outcome) in destinations.iter().zip(outcomes) {
            observability::record_dispatch_outcome(
                &destination.http_method.to_ascii_uppercase(),
                outcome,
            );
            match outcome.failure() {
                None => self.metrics.inc_completed(),
                Some(failure) => {
                    self.metrics.inc_failed();
                    match failure {
                        DispatchFailure::Timeout { .. } => self.metrics.inc_timeouts(),
                        DispatchFailure::Aborted { .. } => self.metrics.inc_aborted(),
                        _ => {}
                    }
                }
            }
        }

        let completed = outcomes.iter().filter(|o| o.status().is_some()).count();
        info!(
            total = outcomes.len(),
            completed,
            failed = outcomes.len() - completed,
            "Dispatch wave settled"
        );
    }
}

/// Send one request, bounded by `timeout` even if the transport ignores it
async fn run_unit<T: HttpTransport>(
    transport: &T,
    request: OutboundRequest,
    timeout: Duration,
) -> DispatchOutcome {
    let destination_id = request.destination_id;
    match tokio::time::timeout(timeout, transport.send(&request, timeout)).await {
        Ok(Ok(status)) => {
            debug!(status, "Destination settled");
            DispatchOutcome::completed(destination_id, status)
        }
        Ok(Err(failure)) => {
            warn!(error = %failure, "Destination failed");
            DispatchOutcome::failed(destination_id, failure)
        }
        Err(_) => {
            let failure = DispatchFailure::timeout(timeout);
            warn!(error = %failure, "Destination timed out");
            DispatchOutcome::failed(destination_id, failure)
        }
    }
}
