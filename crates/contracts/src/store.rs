//! StatusStore trait - outcome persistence interface

use crate::DispatchOutcome;

/// Key-value store of the latest outcome per request id
///
/// Last write wins; no history is kept. Each operation must be atomic on its own.
pub trait StatusStore: Send + Sync {
    /// Record the outcome for `request_id`, replacing any previous one
    fn put(&self, request_id: &str, outcome: DispatchOutcome);

    /// Latest outcome for `request_id`
    fn get(&self, request_id: &str) -> Option<DispatchOutcome>;

    /// Number of stored outcomes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
