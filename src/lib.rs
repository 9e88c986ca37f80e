#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-algebra
//!
//! mesh-algebra manages the sparse connectivity graph ("algebra") of a grid
//! level in a multigrid PDE solver: which degrees of freedom live on which
//! topology entities, which of them are coupled, how couplings are grouped
//! into a hierarchical block partition, and in which order the unknowns are
//! traversed.
//!
//! ## Features
//! - Generation-checked record pools with a per-level heap budget
//! - Vectors, symmetric matrix pairs and extra (fill-in) connections with
//!   O(1) adjoint lookup
//! - Stencil construction of configurable depth across element neighbours
//! - Blockvector trees with bit-packed paths, stripe and domain-halfening
//!   partitions
//! - Lexicographic, shell and streamwise orderings, plus rotational ordering
//!   of 2D adjacency lists
//!
//! ## Invariant checking
//!
//! Structural checks run after every reordering in debug builds, or in
//! release builds with the `check-invariants` / `strict-invariants` features.
//! See [`DebugInvariants`].
//!
//! ## Usage
//!
//! ```ignore
//! use mesh_algebra::prelude::*;
//!
//! let mut grid = StructuredQuadGrid::new(4, 4, 0.25)?;
//! let mut level = AlgebraLevel::new(AlgebraFormat::scalar_nodal(), LevelConfig::default());
//! grid.insert_vectors(&mut level)?;
//! create_connections(&mut level, &grid, grid.elements())?;
//! lex_order(&mut level, &grid, &LexOrderOpts::default())?;
//! ```

pub mod algebra;
pub mod algebra_error;
pub mod algs;
pub mod block;
pub mod data;
pub mod debug_invariants;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algebra::classes::{
        clear_vector_classes, propagate_vector_classes, seed_vector_classes,
    };
    pub use crate::algebra::stencil::{
        build_stencil, create_connections, create_connections_where_needed,
    };
    pub use crate::algebra::{AlgebraLevel, ConnectionId, MatrixId, VectorId, VectorType};
    pub use crate::algebra_error::AlgebraError;
    pub use crate::algs::{
        GreedyFeedback, IndexDependency, LexOrderOpts, PushAllFirst, Rotation, StreamwiseLayout,
        StreamwiseOrder, lex_order, shell_order,
    };
    pub use crate::block::{
        BlockDescription, BlockFormat, create_domain_halfening_partition, create_stripe_partition,
    };
    pub use crate::data::{AlgebraFormat, LevelConfig};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::topology::{ElementTopology, PointId, StructuredQuadGrid, VectorGeometry};
}
