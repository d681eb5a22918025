//! In-memory status store

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use contracts::{DispatchOutcome, StatusStore};

/// `StatusStore` backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    outcomes: Mutex<HashMap<String, DispatchOutcome>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for InMemoryStatusStore {
    fn put(&self, request_id: &str, outcome: DispatchOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id.to_string(), outcome);
    }

    fn get(&self, request_id: &str) -> Option<DispatchOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request_id)
            .cloned()
    }

    fn len(&self) -> usize {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
