//! Dispatcher - idempotent, rate-limited delivery with retry and fallback

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use contracts::{
    Clock, DeliveryBackend, DispatchOutcome, DispatchRequest, RateLimitConfig, RetryConfig,
    ServiceConfig, StatusStore,
};
use observability::metrics::{
    record_backoff_ms, record_dispatch_latency_ms, record_dispatch_outcome,
    record_idempotent_replay,
};

use crate::clock::SystemClock;
use crate::error::DispatcherError;
use crate::handle::BackendHandle;
use crate::idempotency::{Claim, ClaimGuard, IdempotencyTracker};
use crate::metrics::BackendMetricsSnapshot;
use crate::providers::create_backend_handle;
use crate::rate_limiter::{RateLimitSnapshot, RateLimiter};
use crate::retry::RetryPolicy;
use crate::store::InMemoryStatusStore;

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    backends: Vec<BackendHandle>,
    rate_limit: RateLimitConfig,
    retry: RetryConfig,
    deadline: Option<Duration>,
    store: Option<Arc<dyn StatusStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl DispatcherBuilder {
    /// Empty builder with default limits and no backends
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            deadline: None,
            store: None,
            clock: None,
        }
    }

    /// Builder populated from a service configuration
    ///
    /// # Errors
    /// A provider whose params cannot be turned into a backend
    #[instrument(
        name = "dispatcher_builder_from_config",
        skip(config),
        fields(provider_count = config.providers.len())
    )]
    pub fn from_config(config: &ServiceConfig) -> Result<Self, DispatcherError> {
        let mut builder = Self::new()
            .with_rate_limit(config.rate_limit.clone())
            .with_retry(config.retry.clone());
        builder.deadline = config.dispatch.deadline();

        for provider in &config.providers {
            builder = builder.with_backend_handle(create_backend_handle(provider)?);
        }
        Ok(builder)
    }

    /// Append a backend; order is priority order
    pub fn with_backend<B>(self, backend: B) -> Self
    where
        B: DeliveryBackend + Send + Sync + 'static,
    {
        self.with_backend_handle(BackendHandle::new(backend))
    }

    pub fn with_backend_handle(mut self, handle: BackendHandle) -> Self {
        self.backends.push(handle);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Stop retrying after `deadline` (measured from the first attempt)
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the dispatcher
    ///
    /// # Errors
    /// `NoBackends` when no backend was added
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        if self.backends.is_empty() {
            return Err(DispatcherError::NoBackends);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStatusStore::new()));

        info!(
            backends = ?self.backends.iter().map(BackendHandle::name).collect::<Vec<_>>(),
            capacity = self.rate_limit.capacity,
            window_ms = self.rate_limit.window_ms,
            max_retries = self.retry.max_retries,
            deadline = ?self.deadline,
            "Dispatcher built"
        );

        Ok(Dispatcher {
            limiter: RateLimiter::new(&self.rate_limit, Arc::clone(&clock)),
            retry: RetryPolicy::from(&self.retry),
            backends: self.backends,
            tracker: IdempotencyTracker::new(),
            store,
            clock,
            deadline: self.deadline,
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to create a dispatcher from configuration
pub fn create_dispatcher(config: &ServiceConfig) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::from_config(config)?.build()
}

/// Dispatch orchestrator
///
/// Sequences idempotency, rate-limit admission, per-backend retry with
/// backoff, fallback across backends and status recording. Share it through
/// an `Arc`; every method takes `&self`.
pub struct Dispatcher {
    backends: Vec<BackendHandle>,
    limiter: RateLimiter,
    tracker: IdempotencyTracker,
    store: Arc<dyn StatusStore>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    deadline: Option<Duration>,
}

impl Dispatcher {
    /// Start a builder
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Dispatch a request at most once per `request_id`
    ///
    /// Repeated ids get the stored outcome back with the replay message. Ordinary
    /// delivery failures and rate limiting are reported in the outcome.
    ///
    /// # Errors
    /// - `InvalidRequest` for an empty `request_id`
    /// - `ConsistencyViolation` when the id is marked processed but no outcome
    ///   is stored
    #[instrument(
        name = "dispatch",
        skip(self, request),
        fields(request_id = %request.request_id)
    )]
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<DispatchOutcome, DispatcherError> {
        request
            .ensure_valid()
            .map_err(|e| DispatcherError::invalid_request(e.to_string()))?;
        let started = self.clock.now();

        let guard = loop {
            match self.tracker.claim(&request.request_id) {
                Claim::Claimed(guard) => break guard,
                Claim::Processed => return self.replay(&request.request_id),
                Claim::InFlight(waiter) => {
                    debug!("Same request id in flight, waiting");
                    waiter.wait().await;
                }
            }
        };
        let mut sequence = Sequence::new(guard, Arc::clone(&self.store), Arc::clone(&self.clock));

        if !self.limiter.allow() {
            let outcome = DispatchOutcome::rate_limited(&request.request_id, self.clock.now_utc());
            self.store.put(&request.request_id, outcome.clone());
            sequence.release();

            warn!("Rate limit exceeded");
            self.record(&outcome, started);
            return Ok(outcome);
        }

        let request = Arc::new(request);
        let outcome = self.run_backends(&request, &mut sequence).await;
        sequence.finish(outcome.clone());

        info!(
            status = %outcome.status,
            backend = outcome.backend_used.as_deref().unwrap_or_default(),
            attempts = outcome.attempts,
            "Dispatch finished"
        );
        self.record(&outcome, started);
        Ok(outcome)
    }

    /// Latest stored outcome for `request_id`
    pub fn outcome(&self, request_id: &str) -> Option<DispatchOutcome> {
        self.store.get(request_id)
    }

    /// Get metrics for all backends
    pub fn backend_metrics(&self) -> Vec<(String, BackendMetricsSnapshot)> {
        self.backends
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Backend names in priority order
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(BackendHandle::name).collect()
    }

    pub fn rate_limit(&self) -> RateLimitSnapshot {
        self.limiter.snapshot()
    }

    /// Number of request ids whose sequence finished
    pub fn processed_count(&self) -> usize {
        self.tracker.processed_count()
    }

    fn replay(&self, request_id: &str) -> Result<DispatchOutcome, DispatcherError> {
        let Some(stored) = self.store.get(request_id) else {
            error!(request_id, "Request marked processed but no outcome stored");
            return Err(DispatcherError::consistency_violation(request_id));
        };

        debug!(status = %stored.status, "Idempotent replay");
        record_idempotent_replay();
        Ok(stored.replayed())
    }

    /// Walk the backends in order until one delivers
    async fn run_backends(
        &self,
        request: &Arc<DispatchRequest>,
        sequence: &mut Sequence,
    ) -> DispatchOutcome {
        let request_id = request.request_id.as_str();
        let deadline = self.deadline.map(|d| self.clock.now() + d);
        let max_retries = self.retry.max_retries();

        for backend in &self.backends {
            for attempt_index in 0..max_retries {
                if sequence.attempts > 0 && self.deadline_passed(deadline) {
                    return self.timed_out(request_id, sequence);
                }

                // recorded before the call so a dropped sequence keeps the id
                sequence.start_attempt(backend.name());

                if backend.attempt(request, attempt_index).await {
                    return DispatchOutcome::sent(
                        request_id,
                        backend.name(),
                        sequence.attempts,
                        self.clock.now_utc(),
                    );
                }

                if self.retry.has_next(attempt_index) {
                    if self.deadline_passed(deadline) {
                        return self.timed_out(request_id, sequence);
                    }
                    let delay = self.retry.delay_for(attempt_index);
                    debug!(backend = backend.name(), ?delay, "Backing off");
                    record_backoff_ms(backend.name(), delay.as_secs_f64() * 1000.0);
                    self.clock.sleep(delay).await;
                }
            }

            warn!(
                backend = backend.name(),
                max_retries, "Backend exhausted retries, falling back"
            );
        }

        DispatchOutcome::failed(
            request_id,
            sequence.last_backend(),
            sequence.attempts,
            self.clock.now_utc(),
        )
    }

    fn deadline_passed(&self, deadline: Option<Instant>) -> bool {
        deadline.is_some_and(|deadline| self.clock.now() >= deadline)
    }

    fn timed_out(&self, request_id: &str, sequence: &Sequence) -> DispatchOutcome {
        let last_backend = sequence.last_backend();
        warn!(
            attempts = sequence.attempts,
            backend = last_backend,
            "Dispatch deadline exceeded"
        );
        DispatchOutcome::timed_out(
            request_id,
            last_backend,
            sequence.attempts,
            self.clock.now_utc(),
        )
    }

    fn record(&self, outcome: &DispatchOutcome, started: Instant) {
        record_dispatch_outcome(outcome);
        let elapsed = self.clock.now().saturating_duration_since(started);
        record_dispatch_latency_ms(elapsed.as_secs_f64() * 1000.0);
    }
}

/// One claimed dispatch sequence
///
/// Owns the claim on the request id. Dropped before `finish` (the dispatch
/// future was cancelled) it releases the id only if no attempt started;
/// otherwise a detached attempt may still deliver, so an abandoned outcome is
/// stored and the id is marked processed.
struct Sequence {
    guard: Option<ClaimGuard>,
    store: Arc<dyn StatusStore>,
    clock: Arc<dyn Clock>,
    attempts: u32,
    last_backend: Option<String>,
}

impl Sequence {
    fn new(guard: ClaimGuard, store: Arc<dyn StatusStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            guard: Some(guard),
            store,
            clock,
            attempts: 0,
            last_backend: None,
        }
    }

    fn start_attempt(&mut self, backend: &str) {
        self.attempts += 1;
        if self.last_backend.as_deref() != Some(backend) {
            self.last_backend = Some(backend.to_string());
        }
    }

    fn last_backend(&self) -> &str {
        self.last_backend.as_deref().unwrap_or_default()
    }

    /// Store the final outcome and mark the id processed
    fn finish(mut self, outcome: DispatchOutcome) {
        if let Some(guard) = self.guard.take() {
            self.store.put(guard.request_id(), outcome);
            guard.complete();
        }
    }

    /// Give the id back without marking it
    fn release(mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        if self.attempts == 0 {
            return;
        }

        let outcome = DispatchOutcome::abandoned(
            guard.request_id(),
            self.last_backend(),
            self.attempts,
            self.clock.now_utc(),
        );
        warn!(
            request_id = guard.request_id(),
            attempts = self.attempts,
            "Dispatch dropped after delivery started, marking processed"
        );
        self.store.put(guard.request_id(), outcome);
        guard.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::providers::{LogBackend, ScriptedBackend};
    use contracts::{ContractError, DispatchStatus, ScriptStep, ABANDONED_MESSAGE, REPLAY_MESSAGE};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(id: &str) -> DispatchRequest {
        DispatchRequest::new(id, "user@example.com", "Hello", "Body")
    }

    fn retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            ..RetryConfig::default()
        }
    }

    /// Builder with a virtual clock so backoff never really waits
    fn builder(clock: &Arc<ManualClock>) -> DispatcherBuilder {
        Dispatcher::builder().with_clock(clock.clone())
    }

    /// Counts calls and optionally waits before delivering
    struct SlowBackend {
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl DeliveryBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        async fn attempt(&self, _request: &DispatchRequest) -> Result<bool, ContractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(true)
        }
    }

    struct PanickingBackend;

    impl DeliveryBackend for PanickingBackend {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn attempt(&self, _request: &DispatchRequest) -> Result<bool, ContractError> {
            panic!("provider bug");
        }
    }

    #[tokio::test]
    async fn test_first_backend_success() {
        let clock = Arc::new(ManualClock::new());
        let b1 = ScriptedBackend::always_ok("B1");
        let b2 = ScriptedBackend::always_ok("B2");
        let (b1_calls, b2_calls) = (b1.call_counter(), b2.call_counter());
        let dispatcher = builder(&clock)
            .with_backend(b1)
            .with_backend(b2)
            .build()
            .unwrap();

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();

        assert_eq!(outcome.request_id, "r1");
        assert_eq!(outcome.status, DispatchStatus::Sent);
        assert_eq!(outcome.backend_used.as_deref(), Some("B1"));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.message, "Email sent successfully");
        assert_eq!(b1_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b2_calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.outcome("r1"), Some(outcome));
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_request_replays_stored_outcome() {
        let clock = Arc::new(ManualClock::new());
        let b1 = ScriptedBackend::always_ok("B1");
        let calls = b1.call_counter();
        let dispatcher = builder(&clock).with_backend(b1).build().unwrap();

        let first = dispatcher.dispatch(request("r1")).await.unwrap();
        let second = dispatcher.dispatch(request("r1")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.status, first.status);
        assert_eq!(second.backend_used, first.backend_used);
        assert_eq!(second.attempts, first.attempts);
        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(
            second.message,
            "Already processed (idempotent). No new email sent."
        );
        // replay is not persisted
        assert_eq!(dispatcher.outcome("r1"), Some(first));
    }

    #[tokio::test]
    async fn test_fallback_after_retries() {
        let clock = Arc::new(ManualClock::new());
        let a = ScriptedBackend::always_fail("A");
        let b = ScriptedBackend::always_ok("B");
        let a_calls = a.call_counter();
        let dispatcher = builder(&clock)
            .with_retry(retry(3))
            .with_backend(a)
            .with_backend(b)
            .build()
            .unwrap();

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Sent);
        assert_eq!(outcome.backend_used.as_deref(), Some("B"));
        assert_eq!(outcome.attempts, 4);
        assert_eq!(a_calls.load(Ordering::SeqCst), 3);
        // waits only between attempts on the same backend
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn test_all_backends_exhausted() {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = builder(&clock)
            .with_retry(retry(3))
            .with_backend(ScriptedBackend::always_fail("A"))
            .with_backend(ScriptedBackend::always_fail("B"))
            .build()
            .unwrap();

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Failed);
        assert_eq!(outcome.backend_used.as_deref(), Some("B"));
        assert_eq!(outcome.attempts, 6);
        assert_eq!(outcome.message, "All providers failed");
        assert_eq!(clock.sleeps().len(), 4);
        assert_eq!(dispatcher.outcome("r1"), Some(outcome));

        // failed ids stay processed
        let replay = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(replay.status, DispatchStatus::Failed);
        assert_eq!(replay.message, REPLAY_MESSAGE);
        assert_eq!(dispatcher.backend_metrics()[0].1.attempts, 3);
    }

    #[tokio::test]
    async fn test_success_after_retry_on_same_backend() {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = builder(&clock)
            .with_backend(ScriptedBackend::new(
                "B1",
                vec![ScriptStep::Fail, ScriptStep::Fail, ScriptStep::Deliver],
            ))
            .build()
            .unwrap();

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::Sent);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_rate_limit_window() {
        let clock = Arc::new(ManualClock::new());
        let backend = ScriptedBackend::always_ok("B1");
        let calls = backend.call_counter();
        let dispatcher = builder(&clock)
            .with_rate_limit(RateLimitConfig {
                capacity: 5,
                window_ms: 10_000,
            })
            .with_backend(backend)
            .build()
            .unwrap();

        for i in 0..5 {
            let outcome = dispatcher.dispatch(request(&format!("r{i}"))).await.unwrap();
            assert_eq!(outcome.status, DispatchStatus::Sent);
        }

        let limited = dispatcher.dispatch(request("r5")).await.unwrap();
        assert_eq!(limited.status, DispatchStatus::RateLimited);
        assert_eq!(limited.attempts, 0);
        assert_eq!(limited.backend_used, None);
        assert_eq!(limited.message, "Rate limit exceeded");
        assert_eq!(dispatcher.outcome("r5"), Some(limited));
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        // rate-limited ids are not marked, so they can be retried later
        clock.advance(Duration::from_millis(10_001));
        let retried = dispatcher.dispatch(request("r5")).await.unwrap();
        assert_eq!(retried.status, DispatchStatus::Sent);
        assert_eq!(dispatcher.outcome("r5"), Some(retried));
        assert_eq!(dispatcher.processed_count(), 6);
    }

    #[tokio::test]
    async fn test_replay_does_not_consume_rate_limit() {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = builder(&clock)
            .with_rate_limit(RateLimitConfig {
                capacity: 1,
                window_ms: 10_000,
            })
            .with_backend(ScriptedBackend::always_ok("B1"))
            .build()
            .unwrap();

        dispatcher.dispatch(request("r1")).await.unwrap();
        for _ in 0..3 {
            let replay = dispatcher.dispatch(request("r1")).await.unwrap();
            assert_eq!(replay.status, DispatchStatus::Sent);
        }
        assert_eq!(dispatcher.rate_limit().count, 1);
    }

    #[tokio::test]
    async fn test_backend_error_and_panic_count_as_failures() {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = builder(&clock)
            .with_retry(retry(2))
            .with_backend(ScriptedBackend::new("erroring", vec![ScriptStep::Error]))
            .with_backend(PanickingBackend)
            .with_backend(LogBackend::new("log"))
            .build()
            .unwrap();

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Sent);
        assert_eq!(outcome.backend_used.as_deref(), Some("log"));
        assert_eq!(outcome.attempts, 5);

        let metrics = dispatcher.backend_metrics();
        assert_eq!(metrics[0].1.errors, 2);
        assert_eq!(metrics[1].0, "panicky");
        assert_eq!(metrics[1].1.errors, 2);
        assert_eq!(metrics[2].1.successes, 1);
    }

    #[tokio::test]
    async fn test_deadline_stops_retry_loop() {
        let clock = Arc::new(ManualClock::new());
        let b = ScriptedBackend::always_ok("B");
        let b_calls = b.call_counter();
        let dispatcher = builder(&clock)
            .with_retry(retry(3))
            .with_deadline(Duration::from_millis(1200))
            .with_backend(ScriptedBackend::always_fail("A"))
            .with_backend(b)
            .build()
            .unwrap();

        // t=0 attempt, wait 500, t=500 attempt, wait 1000, t=1500 past deadline
        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::TimedOut);
        assert_eq!(outcome.backend_used.as_deref(), Some("A"));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.message, "Dispatch deadline exceeded");
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.outcome("r1"), Some(outcome));

        let replay = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(replay.status, DispatchStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_zero_deadline_still_attempts_once() {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = builder(&clock)
            .with_deadline(Duration::ZERO)
            .with_backend(ScriptedBackend::always_fail("A"))
            .build()
            .unwrap();

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::TimedOut);
        assert_eq!(outcome.attempts, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_id_rejected() {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = builder(&clock)
            .with_backend(ScriptedBackend::always_ok("B1"))
            .build()
            .unwrap();

        let err = dispatcher.dispatch(request("")).await.unwrap_err();
        assert!(matches!(err, DispatcherError::InvalidRequest { .. }));
        assert_eq!(dispatcher.rate_limit().count, 0);
    }

    #[tokio::test]
    async fn test_processed_without_outcome_is_consistency_violation() {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = builder(&clock)
            .with_backend(ScriptedBackend::always_ok("B1"))
            .build()
            .unwrap();

        dispatcher.tracker.mark_processed("ghost");
        let err = dispatcher.dispatch(request("ghost")).await.unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::ConsistencyViolation { ref request_id } if request_id == "ghost"
        ));
    }

    #[test]
    fn test_no_backends_rejected() {
        let result = Dispatcher::builder().build();
        assert!(matches!(result, Err(DispatcherError::NoBackends)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_id_dispatches_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(
            Dispatcher::builder()
                .with_backend(SlowBackend {
                    calls: Arc::clone(&calls),
                    delay: Duration::from_millis(50),
                })
                .build()
                .unwrap(),
        );

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move { dispatcher.dispatch(request("r1")).await })
            })
            .collect();

        let mut replays = 0;
        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            assert_eq!(outcome.status, DispatchStatus::Sent);
            assert_eq!(outcome.attempts, 1);
            if outcome.message == REPLAY_MESSAGE {
                replays += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(replays, 9);
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_after_attempt_keeps_id_processed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::builder()
            .with_backend(SlowBackend {
                calls: Arc::clone(&calls),
                delay: Duration::from_millis(100),
            })
            .build()
            .unwrap();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), dispatcher.dispatch(request("r1")))
                .await;
        assert!(cancelled.is_err());
        assert_eq!(dispatcher.processed_count(), 1);

        let stored = dispatcher.outcome("r1").unwrap();
        assert_eq!(stored.status, DispatchStatus::Failed);
        assert_eq!(stored.backend_used.as_deref(), Some("slow"));
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.message, ABANDONED_MESSAGE);

        let second = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(second.message, REPLAY_MESSAGE);
        assert_eq!(second.status, DispatchStatus::Failed);

        // the detached attempt finishes; nothing else was sent
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_before_attempt_releases_claim() {
        let clock = Arc::new(ManualClock::new());
        let b1 = ScriptedBackend::always_ok("B1");
        let b1_calls = b1.call_counter();
        let dispatcher = builder(&clock).with_backend(b1).build().unwrap();

        // a sequence dropped before its first attempt
        let Claim::Claimed(guard) = dispatcher.tracker.claim("r1") else {
            panic!("expected a fresh claim");
        };
        let sequence = Sequence::new(guard, Arc::clone(&dispatcher.store), clock.clone());
        drop(sequence);

        assert_eq!(dispatcher.processed_count(), 0);
        assert!(dispatcher.outcome("r1").is_none());

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::Sent);
        assert_eq!(b1_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let mut config = ServiceConfig::default();
        config.providers = vec![contracts::ProviderConfig {
            name: "dry-run".into(),
            provider_type: contracts::ProviderType::Log,
            params: Default::default(),
        }];

        let dispatcher = create_dispatcher(&config).unwrap();
        assert_eq!(dispatcher.backend_names(), vec!["dry-run"]);

        let outcome = dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(outcome.status, DispatchStatus::Sent);
        assert_eq!(outcome.backend_used.as_deref(), Some("dry-run"));
    }

    #[tokio::test]
    async fn test_external_store_is_used() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(InMemoryStatusStore::new());
        let dispatcher = builder(&clock)
            .with_store(store.clone())
            .with_backend(ScriptedBackend::always_ok("B1"))
            .build()
            .unwrap();

        dispatcher.dispatch(request("r1")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("r1").unwrap().status, DispatchStatus::Sent);
    }
}
