//! Index-set handles and the registry that tracks which ones are alive.

use crate::error::KError;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An ordered set of global DOF indices owned by the backend.
///
/// Handles are not `Clone`: each one is destroyed exactly once, by value, through
/// `Backend::destroy_index_set`.
#[derive(Debug, PartialEq, Eq)]
pub struct IndexSet {
    id: usize,
    indices: Vec<usize>,
}

impl IndexSet {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Shared between a backend and the Krylov contexts it hands out.
#[derive(Debug, Default)]
pub struct IndexSetRegistry {
    next_id: AtomicUsize,
    live: Mutex<HashSet<usize>>,
}

impl IndexSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashSet<usize>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self, indices: Vec<usize>) -> IndexSet {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live().insert(id);
        IndexSet { id, indices }
    }

    pub fn destroy(&self, is: IndexSet) {
        self.live().remove(&is.id);
    }

    pub fn is_live(&self, id: usize) -> bool {
        self.live().contains(&id)
    }

    pub fn ensure_live(&self, is: &IndexSet) -> Result<(), KError> {
        if self.is_live(is.id) { Ok(()) } else { Err(KError::StaleIndexSet(is.id)) }
    }

    pub fn live_count(&self) -> usize {
        self.live().len()
    }
}
