//! Communicators: where the process count seen by the strategy table comes from.

/// Minimal communicator interface used by the smoother.
pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
}

#[cfg(feature="mpi")]
pub mod mpi_comm;
#[cfg(feature="mpi")]
pub use mpi_comm::MpiComm;

#[cfg(feature="rayon")]
pub mod rayon_comm;
#[cfg(feature="rayon")]
pub use rayon_comm::RayonComm;

pub enum UniverseComm {
    Serial,
    #[cfg(feature="mpi")]
    Mpi(MpiComm),
    #[cfg(feature="rayon")]
    Rayon(RayonComm),
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            UniverseComm::Serial => 0,
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            #[cfg(feature="rayon")]
            UniverseComm::Rayon(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            UniverseComm::Serial => 1,
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            #[cfg(feature="rayon")]
            UniverseComm::Rayon(comm) => comm.size(),
        }
    }
}

impl Default for UniverseComm {
    fn default() -> Self {
        UniverseComm::Serial
    }
}
