//! MPI communicator for distributed runs.
//!
//! Every rank runs the same smoother over its local rows; only the process count and
//! rank are consumed here, the distributed linear algebra stays in the backend.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use kryst_smoother::parallel::{Comm, MpiComm};
//! let comm = MpiComm::new().expect("MPI already initialized");
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! # }
//! ```

#[cfg(feature = "mpi")]
use mpi::traits::*;
#[cfg(feature = "mpi")]
use mpi::topology::SimpleCommunicator;

#[cfg(feature = "mpi")]
pub struct MpiComm {
    /// Keeps MPI initialized for the lifetime of the communicator.
    _universe: mpi::environment::Universe,
    pub world: SimpleCommunicator,
    pub rank: usize,
    pub size: usize,
}

#[cfg(feature = "mpi")]
impl MpiComm {
    /// Initializes MPI; `None` if it was already initialized elsewhere.
    pub fn new() -> Option<Self> {
        let universe = mpi::initialize()?;
        let world    = universe.world();
        let rank     = world.rank() as usize;
        let size     = world.size() as usize;
        Some(MpiComm { _universe: universe, world, rank, size })
    }
}

#[cfg(feature = "mpi")]
impl super::Comm for MpiComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
}
