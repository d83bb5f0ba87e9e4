//! In-process backend on top of `faer`.
//!
//! Every rank holds the whole operator; the communicator only supplies the process
//! count, which becomes the number of block-Jacobi chunks.

use crate::backend::{Backend, IndexSet, IndexSetRegistry};
use crate::context::KspContext;
use crate::parallel::{Comm, UniverseComm};
use std::sync::Arc;

pub struct FaerBackend {
    comm: UniverseComm,
    registry: Arc<IndexSetRegistry>,
}

impl FaerBackend {
    pub fn new(comm: UniverseComm) -> Self {
        Self { comm, registry: Arc::new(IndexSetRegistry::new()) }
    }

    /// Single process.
    pub fn serial() -> Self {
        Self::new(UniverseComm::Serial)
    }

    pub fn comm(&self) -> &UniverseComm {
        &self.comm
    }

    /// Shared handle on the index-set registry, usable after the backend is moved.
    pub fn registry(&self) -> Arc<IndexSetRegistry> {
        Arc::clone(&self.registry)
    }
}

impl Default for FaerBackend {
    fn default() -> Self {
        Self::serial()
    }
}

impl Backend for FaerBackend {
    type Ksp = KspContext;

    fn process_count(&self) -> usize {
        self.comm.size()
    }

    fn create_index_set(&mut self, indices: Vec<usize>) -> IndexSet {
        self.registry.create(indices)
    }

    fn destroy_index_set(&mut self, is: IndexSet) {
        self.registry.destroy(is);
    }

    fn live_index_sets(&self) -> usize {
        self.registry.live_count()
    }

    fn create_ksp(&mut self) -> KspContext {
        KspContext::new(Arc::clone(&self.registry), self.comm.size())
    }
}
