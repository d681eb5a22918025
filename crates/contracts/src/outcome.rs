//! DispatchOutcome - Dispatcher output
//!
//! One outcome per dispatch call. Outcomes are never mutated after creation;
//! an idempotent replay is a copy with a different message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message for a successful delivery
pub const SENT_MESSAGE: &str = "Email sent successfully";
/// Message when every backend exhausted its retries
pub const FAILED_MESSAGE: &str = "All providers failed";
/// Message for a request rejected by the rate limiter
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded";
/// Message for a deadline abort
pub const TIMED_OUT_MESSAGE: &str = "Dispatch deadline exceeded";
/// Message for a dispatch dropped after delivery started
pub const ABANDONED_MESSAGE: &str = "Dispatch abandoned after delivery started";
/// Message attached to replayed outcomes
pub const REPLAY_MESSAGE: &str = "Already processed (idempotent). No new email sent.";

/// Final status of a dispatch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    Sent,
    Failed,
    RateLimited,
    /// Optional deadline elapsed before the sequence finished
    TimedOut,
}

impl DispatchStatus {
    /// Terminal statuses are recorded as processed; rate-limited requests may retry
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::RateLimited)
    }

    /// Conventional HTTP status code for transports
    pub fn http_status_hint(self) -> u16 {
        match self {
            Self::Sent => 200,
            Self::RateLimited => 429,
            Self::Failed => 503,
            Self::TimedOut => 504,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
            Self::RateLimited => "RATE_LIMITED",
            Self::TimedOut => "TIMED_OUT",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one dispatch sequence
///
/// Invariants: `attempts == 0` iff `status == RateLimited`; `backend_used` is
/// set iff at least one attempt was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub request_id: String,
    pub status: DispatchStatus,
    /// Backend that succeeded, or the last one attempted
    pub backend_used: Option<String>,
    /// Delivery calls made across all backends
    pub attempts: u32,
    pub message: String,
    /// When the outcome was finalized
    pub timestamp: DateTime<Utc>,
}

impl DispatchOutcome {
    pub fn sent(
        request_id: impl Into<String>,
        backend: impl Into<String>,
        attempts: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            status: DispatchStatus::Sent,
            backend_used: Some(backend.into()),
            attempts,
            message: SENT_MESSAGE.to_string(),
            timestamp,
        }
    }

    pub fn failed(
        request_id: impl Into<String>,
        last_backend: impl Into<String>,
        attempts: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            status: DispatchStatus::Failed,
            backend_used: Some(last_backend.into()),
            attempts,
            message: FAILED_MESSAGE.to_string(),
            timestamp,
        }
    }

    pub fn rate_limited(request_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            request_id: request_id.into(),
            status: DispatchStatus::RateLimited,
            backend_used: None,
            attempts: 0,
            message: RATE_LIMITED_MESSAGE.to_string(),
            timestamp,
        }
    }

    pub fn timed_out(
        request_id: impl Into<String>,
        last_backend: impl Into<String>,
        attempts: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            status: DispatchStatus::TimedOut,
            backend_used: Some(last_backend.into()),
            attempts,
            message: TIMED_OUT_MESSAGE.to_string(),
            timestamp,
        }
    }

    /// Failed outcome for a sequence dropped mid-flight
    ///
    /// A detached attempt may still deliver, so the id stays processed.
    pub fn abandoned(
        request_id: impl Into<String>,
        last_backend: impl Into<String>,
        attempts: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            message: ABANDONED_MESSAGE.to_string(),
            ..Self::failed(request_id, last_backend, attempts, timestamp)
        }
    }

    /// Copy of a stored outcome returned for a repeated request id
    ///
    /// Status, backend, attempts and timestamp are preserved.
    pub fn replayed(&self) -> Self {
        Self {
            message: REPLAY_MESSAGE.to_string(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_hold_invariants() {
        let now = Utc::now();
        let limited = DispatchOutcome::rate_limited("r1", now);
        assert_eq!(limited.attempts, 0);
        assert!(limited.backend_used.is_none());

        let sent = DispatchOutcome::sent("r2", "B1", 1, now);
        assert_eq!(sent.backend_used.as_deref(), Some("B1"));
        assert_eq!(sent.message, SENT_MESSAGE);

        let failed = DispatchOutcome::failed("r3", "B2", 6, now);
        assert_eq!(failed.status, DispatchStatus::Failed);
        assert_eq!(failed.message, FAILED_MESSAGE);

        let abandoned = DispatchOutcome::abandoned("r4", "B1", 1, now);
        assert_eq!(abandoned.status, DispatchStatus::Failed);
        assert_eq!(abandoned.backend_used.as_deref(), Some("B1"));
        assert_eq!(abandoned.message, ABANDONED_MESSAGE);
    }

    #[test]
    fn test_replay_preserves_everything_but_message() {
        let original = DispatchOutcome::sent("r1", "B1", 2, Utc::now());
        let replay = original.replayed();
        assert_eq!(replay.status, original.status);
        assert_eq!(replay.backend_used, original.backend_used);
        assert_eq!(replay.attempts, original.attempts);
        assert_eq!(replay.timestamp, original.timestamp);
        assert_eq!(replay.message, REPLAY_MESSAGE);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&DispatchStatus::RateLimited).unwrap();
        assert_eq!(json, "\"RATE_LIMITED\"");
        assert_eq!(DispatchStatus::TimedOut.to_string(), "TIMED_OUT");
        assert!(!DispatchStatus::RateLimited.is_terminal());
        assert!(DispatchStatus::Failed.is_terminal());
        assert_eq!(DispatchStatus::RateLimited.http_status_hint(), 429);
    }
}
