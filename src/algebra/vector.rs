//! Vector records: the degrees of freedom of a grid level.

use crate::algebra::matrix::MatrixId;
use crate::block::description::BlockDescription;
use crate::data::pool::Handle;
use crate::topology::point::PointId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a [`Vector`] inside its level.
pub type VectorId = Handle<Vector>;

/// Topology entity kind a vector is attached to.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum VectorType {
    Node,
    Edge,
    Side,
    Element,
}

impl VectorType {
    pub const COUNT: usize = 4;
    pub const ALL: [VectorType; Self::COUNT] = [
        VectorType::Node,
        VectorType::Edge,
        VectorType::Side,
        VectorType::Element,
    ];

    /// Dense index used by format tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for VectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VectorType::Node => "node",
            VectorType::Edge => "edge",
            VectorType::Side => "side",
            VectorType::Element => "element",
        };
        f.write_str(name)
    }
}

/// Vector class used by coarsening and class propagation.
pub mod class {
    /// Not reached by any propagation.
    pub const UNTOUCHED: u8 = 0;
    /// Second ring around the seed vectors.
    pub const OUTER: u8 = 1;
    /// Direct neighbours of the seed vectors.
    pub const NEIGHBOR: u8 = 2;
    /// Seed vectors; also the class of newly created vectors.
    pub const SEED: u8 = 3;
}

/// A degree-of-freedom record.
#[derive(Clone, Debug)]
pub struct Vector {
    pub(crate) vtype: VectorType,
    pub(crate) object: Option<PointId>,
    pub(crate) class: u8,
    pub(crate) index: usize,
    pub(crate) build_connections: bool,
    pub(crate) skip: u32,
    pub(crate) values: Box<[f64]>,
    pub(crate) block: BlockDescription,
    // list and adjacency links
    pub(crate) pred: Option<VectorId>,
    pub(crate) succ: Option<VectorId>,
    pub(crate) diag: Option<MatrixId>,
    pub(crate) first_offdiag: Option<MatrixId>,
    // scratch flag of traversals
    pub(crate) used: bool,
}

impl Vector {
    pub(crate) fn new(vtype: VectorType, object: Option<PointId>, components: usize) -> Self {
        Self {
            vtype,
            object,
            class: class::SEED,
            index: 0,
            build_connections: true,
            skip: 0,
            values: vec![0.0; components].into_boxed_slice(),
            block: BlockDescription::default(),
            pred: None,
            succ: None,
            diag: None,
            first_offdiag: None,
            used: false,
        }
    }

    #[inline]
    pub fn vtype(&self) -> VectorType {
        self.vtype
    }

    /// Topology entity this vector lives on.
    #[inline]
    pub fn object(&self) -> Option<PointId> {
        self.object
    }

    #[inline]
    pub fn class(&self) -> u8 {
        self.class
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// `true` while the vector's adjacency still has to be (re)built.
    #[inline]
    pub fn needs_connections(&self) -> bool {
        self.build_connections
    }

    /// Per-component skip bits (e.g. Dirichlet constrained components).
    #[inline]
    pub fn skip(&self) -> u32 {
        self.skip
    }

    #[inline]
    pub fn is_skip(&self) -> bool {
        self.skip != 0
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.values.len()
    }

    /// Component storage, zero-initialized at creation.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Block path of the vector inside the current partition, if any.
    #[inline]
    pub fn block(&self) -> &BlockDescription {
        &self.block
    }

    /// Previous vector in the level list.
    #[inline]
    pub fn pred(&self) -> Option<VectorId> {
        self.pred
    }

    /// Next vector in the level list.
    #[inline]
    pub fn succ(&self) -> Option<VectorId> {
        self.succ
    }

    /// Diagonal matrix entry, if allocated.
    #[inline]
    pub fn diagonal(&self) -> Option<MatrixId> {
        self.diag
    }

    /// Head of the off-diagonal adjacency list.
    #[inline]
    pub fn first_off_diagonal(&self) -> Option<MatrixId> {
        self.first_offdiag
    }
}
