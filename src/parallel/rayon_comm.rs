// rayon-backed virtual ranks: one address space, `size` block-Jacobi partitions

pub struct RayonComm {
    size: usize,
}

impl RayonComm {
    /// One virtual rank per CPU; also sizes the global rayon pool.
    pub fn new() -> Self {
        let size = num_cpus::get();
        rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .build_global()
            .ok();
        RayonComm { size }
    }

    /// Fixed number of virtual ranks, leaving the rayon pool alone.
    pub fn with_size(size: usize) -> Self {
        RayonComm { size: size.max(1) }
    }
}

impl Default for RayonComm {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Comm for RayonComm {
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { self.size }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::Comm;

    #[test]
    fn with_size_clamps_to_one() {
        assert_eq!(RayonComm::with_size(0).size(), 1);
        assert_eq!(RayonComm::with_size(4).size(), 4);
    }
}
