//! Map from global DOF to scalar component ordinal.

use crate::error::KError;

/// Component ordinal (`0..n_components`) of every global DOF.
///
/// The mesh/DOF layer owns the numbering; the smoother only needs to know which
/// variable each DOF belongs to so that a block can be split for a Schur field split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DofLayout {
    n_components: usize,
    component_of: Vec<usize>,
}

impl DofLayout {
    /// `dof = node * n_components + c`.
    pub fn interleaved(n_nodes: usize, n_components: usize) -> Self {
        let component_of = (0..n_nodes * n_components).map(|dof| dof % n_components).collect();
        Self { n_components, component_of }
    }

    /// `dof = c * n_nodes + node`.
    pub fn blocked(n_nodes: usize, n_components: usize) -> Self {
        let component_of = (0..n_components)
            .flat_map(|c| std::iter::repeat(c).take(n_nodes))
            .collect();
        Self { n_components, component_of }
    }

    /// One scalar component per DOF; every block stays unsplit.
    pub fn scalar(n_dofs: usize) -> Self {
        Self { n_components: 1, component_of: vec![0; n_dofs] }
    }

    /// Explicit per-DOF component list. Fails if an ordinal is `>= n_components`.
    pub fn from_components(n_components: usize, component_of: Vec<usize>) -> Result<Self, KError> {
        if let Some((dof, &c)) = component_of.iter().enumerate().find(|&(_, &c)| c >= n_components) {
            return Err(KError::InvalidPartition(format!(
                "dof {dof} has component {c}, layout has {n_components} components"
            )));
        }
        Ok(Self { n_components, component_of })
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn len(&self) -> usize {
        self.component_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.component_of.is_empty()
    }

    /// Component of `dof`, or `None` outside the layout.
    pub fn component(&self, dof: usize) -> Option<usize> {
        self.component_of.get(dof).copied()
    }
}
