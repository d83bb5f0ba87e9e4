//! Vanka block index sets and their Schur splits.
//!
//! An [`IndexPartition`] turns the per-block DOF membership supplied by the mesh layer
//! into backend index-set handles, once per solver instance. With a Schur split each
//! block additionally gets an A-part (primary variables) and a B-part (the last
//! `num_schur_vars` components of every node), both in the block's own order.
//!
//! The partition never releases handles on its own: `clear` must be given the backend
//! that created them.

pub mod layout;

pub use layout::DofLayout;

use crate::backend::{Backend, IndexSet};
use crate::error::KError;
use std::collections::HashSet;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionState {
    Uninitialized,
    PartitionsBuilt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStatus {
    /// Handles were allocated by this call.
    Built,
    /// Partitions already existed; nothing changed.
    AlreadyBuilt,
}

/// The two disjoint halves of a block.
#[derive(Debug)]
pub struct SchurSplit {
    pub a_part: IndexSet,
    pub b_part: IndexSet,
}

/// Handles owned for one block.
#[derive(Debug)]
pub struct BlockIndexSets {
    pub whole: IndexSet,
    pub split: Option<SchurSplit>,
}

/// What a partition was built from; used to detect a changed request.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PartitionKey {
    blocks: Vec<Vec<usize>>,
    num_schur_vars: usize,
    use_schur: bool,
}

/// Split `dofs` by component ordinal: the last `num_schur_vars` components go to B.
///
/// Every DOF must be inside `layout`; relative order is preserved in both parts.
pub fn split_block(layout: &DofLayout, dofs: &[usize], num_schur_vars: usize) -> Result<(Vec<usize>, Vec<usize>), KError> {
    let n_comp = layout.n_components();
    if num_schur_vars > n_comp {
        return Err(KError::InvalidPartition(format!(
            "num_schur_vars = {num_schur_vars} exceeds the {n_comp} components per node"
        )));
    }
    let first_b = n_comp - num_schur_vars;
    let mut a_part = Vec::with_capacity(dofs.len());
    let mut b_part = Vec::new();
    for &dof in dofs {
        let c = layout
            .component(dof)
            .ok_or_else(|| KError::InvalidPartition(format!("dof {dof} outside a layout of {} dofs", layout.len())))?;
        if c >= first_b { b_part.push(dof) } else { a_part.push(dof) }
    }
    Ok((a_part, b_part))
}

#[derive(Debug)]
pub struct IndexPartition {
    state: PartitionState,
    key: Option<PartitionKey>,
    blocks: Vec<BlockIndexSets>,
}

impl IndexPartition {
    pub fn new() -> Self {
        Self { state: PartitionState::Uninitialized, key: None, blocks: Vec::new() }
    }

    pub fn state(&self) -> PartitionState {
        self.state
    }

    pub fn blocks(&self) -> &[BlockIndexSets] {
        &self.blocks
    }

    /// Whether the cached partition was built from exactly this request.
    pub fn matches(&self, blocks: &[Vec<usize>], num_schur_vars: usize, use_schur: bool) -> bool {
        self.key.as_ref().is_some_and(|k| {
            k.blocks.as_slice() == blocks && k.num_schur_vars == num_schur_vars && k.use_schur == use_schur
        })
    }

    fn validate(
        layout: &DofLayout,
        blocks: &[Vec<usize>],
        split: Option<usize>,
    ) -> Result<Vec<Option<(Vec<usize>, Vec<usize>)>>, KError> {
        if let Some(nsv) = split.filter(|&nsv| nsv > layout.n_components()) {
            return Err(KError::InvalidPartition(format!(
                "num_schur_vars = {nsv} exceeds the {} components per node",
                layout.n_components()
            )));
        }
        blocks
            .iter()
            .enumerate()
            .map(|(b, dofs)| {
                if dofs.is_empty() {
                    return Err(KError::InvalidPartition(format!("block {b} is empty")));
                }
                let mut seen = HashSet::with_capacity(dofs.len());
                for &dof in dofs {
                    if dof >= layout.len() {
                        return Err(KError::InvalidPartition(format!(
                            "block {b}: dof {dof} outside a layout of {} dofs",
                            layout.len()
                        )));
                    }
                    if !seen.insert(dof) {
                        return Err(KError::InvalidPartition(format!("block {b} lists dof {dof} twice")));
                    }
                }
                split.map(|nsv| split_block(layout, dofs, nsv)).transpose()
            })
            .collect()
    }

    /// Build one handle per block, plus A/B handles when splitting.
    ///
    /// The split is computed only for `use_schur` with `num_schur_vars > 0`. A second
    /// call before [`clear`](Self::clear) returns `AlreadyBuilt` without touching the
    /// cached handles. Input is validated completely before any handle is allocated.
    pub fn build<B: Backend>(
        &mut self,
        backend: &mut B,
        layout: &DofLayout,
        blocks: &[Vec<usize>],
        num_schur_vars: usize,
        use_schur: bool,
    ) -> Result<BuildStatus, KError> {
        if self.state == PartitionState::PartitionsBuilt {
            return Ok(BuildStatus::AlreadyBuilt);
        }
        let split = (use_schur && num_schur_vars > 0).then_some(num_schur_vars);
        let parts = Self::validate(layout, blocks, split)?;

        self.blocks = blocks
            .iter()
            .zip(parts)
            .map(|(dofs, part)| BlockIndexSets {
                whole: backend.create_index_set(dofs.clone()),
                split: part.map(|(a, b)| SchurSplit {
                    a_part: backend.create_index_set(a),
                    b_part: backend.create_index_set(b),
                }),
            })
            .collect();
        self.key = Some(PartitionKey { blocks: blocks.to_vec(), num_schur_vars, use_schur });
        self.state = PartitionState::PartitionsBuilt;
        debug!(blocks = self.blocks.len(), split = split.is_some(), "index partition built");
        Ok(BuildStatus::Built)
    }

    /// Destroy every handle through `backend` and return to `Uninitialized`.
    pub fn clear<B: Backend>(&mut self, backend: &mut B) {
        for block in self.blocks.drain(..) {
            backend.destroy_index_set(block.whole);
            if let Some(split) = block.split {
                backend.destroy_index_set(split.a_part);
                backend.destroy_index_set(split.b_part);
            }
        }
        self.key = None;
        self.state = PartitionState::Uninitialized;
    }
}

impl Default for IndexPartition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FaerBackend;

    #[test]
    fn split_follows_component_ordinal() {
        // velocity (u, v) + pressure p per node
        let layout = DofLayout::interleaved(3, 3);
        let (a, b) = split_block(&layout, &[8, 0, 1, 2, 5, 4], 1).unwrap();
        assert_eq!(a, vec![0, 1, 4]);
        assert_eq!(b, vec![8, 2, 5]);
    }

    #[test]
    fn whole_layout_in_b_when_all_components_are_schur() {
        let layout = DofLayout::interleaved(2, 2);
        let (a, b) = split_block(&layout, &[0, 1, 2, 3], 2).unwrap();
        assert!(a.is_empty());
        assert_eq!(b, vec![0, 1, 2, 3]);
    }

    #[test]
    fn unsplit_build_keeps_membership() {
        let mut backend = FaerBackend::serial();
        let layout = DofLayout::scalar(6);
        let mut part = IndexPartition::new();
        let blocks = vec![vec![2, 0, 1], vec![5, 3]];
        assert_eq!(part.build(&mut backend, &layout, &blocks, 0, true).unwrap(), BuildStatus::Built);
        assert_eq!(part.state(), PartitionState::PartitionsBuilt);
        assert_eq!(part.blocks()[0].whole.indices(), &[2, 0, 1]);
        assert!(part.blocks().iter().all(|b| b.split.is_none()));
        assert_eq!(backend.live_index_sets(), 2);
        part.clear(&mut backend);
        assert_eq!(backend.live_index_sets(), 0);
        assert_eq!(part.state(), PartitionState::Uninitialized);
    }

    #[test]
    fn split_build_allocates_three_handles_per_block() {
        let mut backend = FaerBackend::serial();
        let layout = DofLayout::interleaved(4, 2);
        let mut part = IndexPartition::new();
        part.build(&mut backend, &layout, &[vec![0, 1, 2, 3], vec![4, 5, 6, 7]], 1, true).unwrap();
        assert_eq!(backend.live_index_sets(), 6);
        assert!(part.matches(&[vec![0, 1, 2, 3], vec![4, 5, 6, 7]], 1, true));
        assert!(!part.matches(&[vec![0, 1, 2, 3]], 1, true));
        part.clear(&mut backend);
    }

    #[test]
    fn invalid_input_allocates_nothing() {
        let mut backend = FaerBackend::serial();
        let layout = DofLayout::interleaved(3, 2);
        let mut part = IndexPartition::new();
        let cases: Vec<(Vec<Vec<usize>>, usize)> = vec![
            (vec![vec![0, 1], vec![]], 0),
            (vec![vec![0, 1]], 3),
            (vec![vec![0, 6]], 0),
            (vec![vec![0, 1, 0]], 0),
        ];
        for (blocks, nsv) in cases {
            let err = part.build(&mut backend, &layout, &blocks, nsv, true).unwrap_err();
            assert!(matches!(err, KError::InvalidPartition(_)), "{err}");
            assert_eq!(backend.live_index_sets(), 0);
            assert_eq!(part.state(), PartitionState::Uninitialized);
        }
    }
}
