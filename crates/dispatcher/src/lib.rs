//! # Dispatcher
//!
//! Email dispatch core.
//!
//! Responsibilities:
//! - At-most-once dispatch per `request_id` (idempotency with single-flight claims)
//! - Global fixed-window rate limiting
//! - Per-backend retry with exponential backoff, fallback across backends
//! - Recording every outcome in a `StatusStore`

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod idempotency;
pub mod metrics;
pub mod providers;
pub mod rate_limiter;
pub mod retry;
pub mod store;

pub use clock::{ManualClock, SystemClock};
pub use contracts::{DeliveryBackend, DispatchOutcome, DispatchRequest, DispatchStatus};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use handle::BackendHandle;
pub use idempotency::{Claim, ClaimGuard, IdempotencyTracker};
pub use metrics::{BackendMetrics, BackendMetricsSnapshot};
pub use providers::{create_backend_handle, LogBackend, MockBackend, ScriptedBackend};
pub use rate_limiter::{RateLimitSnapshot, RateLimiter};
pub use retry::RetryPolicy;
pub use store::InMemoryStatusStore;
