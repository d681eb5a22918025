//! DispatchRequest - caller input to the dispatcher
//!
//! Everything except `request_id` is opaque to the core.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ContractError;

/// Request to deliver one email
///
/// `request_id` is the idempotency and status key: one id per logical send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DispatchRequest {
    /// Caller-supplied unique id
    #[serde(alias = "requestId")]
    #[validate(length(min = 1, message = "request_id must not be empty"))]
    pub request_id: String,

    /// Recipient address
    #[serde(alias = "to")]
    pub recipient: String,

    /// Subject line
    #[serde(default)]
    pub subject: String,

    /// Message body
    #[serde(default)]
    pub body: String,
}

impl DispatchRequest {
    pub fn new(
        request_id: impl Into<String>,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Check the only field the core cares about
    ///
    /// # Errors
    /// Returns `InvalidRequest` when `request_id` is empty
    pub fn ensure_valid(&self) -> Result<(), ContractError> {
        self.validate()
            .map_err(|e| ContractError::invalid_request(e.to_string()))
    }
}
