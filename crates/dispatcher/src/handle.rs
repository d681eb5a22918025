//! BackendHandle - type-erased delivery backend with isolated attempts

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use contracts::{ContractError, DeliveryBackend, DispatchRequest};
use observability::metrics::{record_delivery_attempt, AttemptResult};

use crate::metrics::BackendMetrics;

type AttemptFuture = Pin<Box<dyn Future<Output = Result<bool, ContractError>> + Send>>;
type AttemptFn = dyn Fn(Arc<DispatchRequest>) -> AttemptFuture + Send + Sync;

/// Handle to a delivery backend
///
/// Lets backends of different concrete types share one ordered list. Every
/// attempt runs on its own task, so a panicking backend only costs that attempt.
#[derive(Clone)]
pub struct BackendHandle {
    /// Backend name
    name: String,
    attempt_fn: Arc<AttemptFn>,
    /// Shared counters
    metrics: Arc<BackendMetrics>,
}

impl BackendHandle {
    /// Wrap a backend
    pub fn new<B>(backend: B) -> Self
    where
        B: DeliveryBackend + Send + Sync + 'static,
    {
        let name = backend.name().to_string();
        let backend = Arc::new(backend);

        let attempt_fn: Arc<AttemptFn> = Arc::new(move |request: Arc<DispatchRequest>| {
            let backend = Arc::clone(&backend);
            Box::pin(async move { backend.attempt(&request).await }) as AttemptFuture
        });

        Self {
            name,
            attempt_fn,
            metrics: Arc::new(BackendMetrics::new()),
        }
    }

    /// Get backend name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<BackendMetrics> {
        &self.metrics
    }

    /// Make one delivery attempt
    ///
    /// Returns true only when the backend reported delivery. Errors and panics
    /// are logged and reported as a failed attempt.
    #[instrument(
        name = "backend_attempt",
        skip(self, request),
        fields(backend = %self.name, request_id = %request.request_id)
    )]
    pub async fn attempt(&self, request: &Arc<DispatchRequest>, attempt_index: u32) -> bool {
        self.metrics.inc_attempts();
        let task = tokio::spawn((self.attempt_fn)(Arc::clone(request)));

        match task.await {
            Ok(Ok(true)) => {
                self.metrics.inc_successes();
                record_delivery_attempt(&self.name, AttemptResult::Success);
                debug!(attempt = attempt_index + 1, "Delivery succeeded");
                true
            }
            Ok(Ok(false)) => {
                self.metrics.inc_failures();
                record_delivery_attempt(&self.name, AttemptResult::Failure);
                warn!(attempt = attempt_index + 1, "Delivery attempt failed");
                false
            }
            Ok(Err(e)) => {
                self.metrics.inc_errors();
                record_delivery_attempt(&self.name, AttemptResult::Error);
                error!(attempt = attempt_index + 1, error = %e, "Delivery attempt errored");
                false
            }
            Err(e) => {
                self.metrics.inc_errors();
                record_delivery_attempt(&self.name, AttemptResult::Error);
                error!(attempt = attempt_index + 1, error = ?e, "Delivery task panicked");
                false
            }
        }
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("name", &self.name)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}
