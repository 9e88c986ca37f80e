//! Discretization format consumed by the connectivity store.
//!
//! The format answers three questions for the algebra layer:
//! how many scalar components a vector of a given type owns, whether two
//! vector types interact at all, and up to which element distance they must
//! be coupled (the *connection depth*).

use crate::algebra::vector::VectorType;
use serde::{Deserialize, Serialize};

const NTYPES: usize = VectorType::COUNT;

/// Component counts and connection depth table of a discretization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgebraFormat {
    components: [usize; NTYPES],
    depth: [[Option<u32>; NTYPES]; NTYPES],
}

impl AlgebraFormat {
    /// An empty format: no vector types, no interactions.
    pub fn new() -> Self {
        Self::default()
    }

    /// One scalar unknown per node, coupled within each element.
    pub fn scalar_nodal() -> Self {
        Self::new()
            .with_components(VectorType::Node, 1)
            .with_connection(VectorType::Node, VectorType::Node, 0)
    }

    /// Set the number of components of `vtype` vectors.
    pub fn with_components(mut self, vtype: VectorType, components: usize) -> Self {
        self.components[vtype.index()] = components;
        self
    }

    /// Couple `a` and `b` vectors of elements at distance `≤ depth`.
    ///
    /// The table is kept symmetric.
    pub fn with_connection(mut self, a: VectorType, b: VectorType, depth: u32) -> Self {
        self.depth[a.index()][b.index()] = Some(depth);
        self.depth[b.index()][a.index()] = Some(depth);
        self
    }

    /// Number of scalar components of a `vtype` vector.
    #[inline]
    pub fn components(&self, vtype: VectorType) -> usize {
        self.components[vtype.index()]
    }

    /// Required connection depth between two vector types, if they interact.
    #[inline]
    pub fn connection_depth(&self, a: VectorType, b: VectorType) -> Option<u32> {
        self.depth[a.index()][b.index()]
    }

    /// Number of matrix entries (`f64`) stored for an `a → b` coupling.
    ///
    /// Zero means that no interaction is defined.
    pub fn matrix_payload(&self, a: VectorType, b: VectorType) -> usize {
        match self.connection_depth(a, b) {
            Some(_) => self.components(a) * self.components(b),
            None => 0,
        }
    }

    /// Largest connection depth in the table.
    pub fn max_connection_depth(&self) -> Option<u32> {
        self.depth.iter().flatten().flatten().copied().max()
    }

    /// Vector types that carry at least one component.
    pub fn vector_types(&self) -> impl Iterator<Item = VectorType> + '_ {
        VectorType::ALL
            .into_iter()
            .filter(|&vtype| self.components(vtype) > 0)
    }
}

/// Per-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Grid level number (0 = coarsest geometric level, negative = algebraic).
    pub level: i32,
    /// Byte budget of the level heap; `None` for unbounded.
    pub heap_bytes: Option<usize>,
}
