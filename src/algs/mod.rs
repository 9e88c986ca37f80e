//! Ordering engine: in-place reorderings of the vector list.
//!
//! - [`lex`]: geometric lexicographic order with a tolerance band
//! - [`shell`]: breadth-first shells around a seed vector
//! - [`streamwise`]: two-sided topological order with cycle breaking
//! - [`circular`]: rotational ordering of 2D adjacency lists
//!
//! Every strategy relinks the complete list in one step and fails with
//! [`AlgebraError::Inconsistency`] if it did not account for every vector.

pub mod circular;
pub mod lex;
pub mod shell;
pub mod streamwise;

pub use circular::{Rotation, order_adjacency_circular};
pub use lex::{AxisKey, LexOrderOpts, SkipPlacement, lex_order};
pub use shell::shell_order;
pub use streamwise::{
    CutContext, CutSetProcedure, DependencyProcedure, FlowDependency, GreedyFeedback,
    IndexDependency, PushAllFirst, StreamwiseLayout, StreamwiseOpts, StreamwiseOrder,
    StreamwiseReport, order_vectors_algebraic,
};

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra_error::AlgebraError;
use crate::topology::access::{Position, VectorGeometry};

/// Position of the entity `v` lives on.
pub(crate) fn vector_position<G>(
    level: &AlgebraLevel,
    geometry: &G,
    v: VectorId,
) -> Result<Position, AlgebraError>
where
    G: VectorGeometry + ?Sized,
{
    let rec = level.vector(v)?;
    let object = rec
        .object()
        .ok_or_else(|| AlgebraError::NotFound(format!("vector {v:?} has no topology entity")))?;
    geometry
        .position(object, rec.vtype())
        .ok_or_else(|| AlgebraError::NotFound(format!("no position for entity {object}")))
}

/// Sorts every off-diagonal list by destination index.
pub fn order_matrices(level: &mut AlgebraLevel) -> Result<(), AlgebraError> {
    for v in level.vector_ids() {
        let mut entries: Vec<_> = level
            .off_diagonal(v)
            .map(|(m, mat)| (m, mat.dest()))
            .collect();
        let mut keyed = Vec::with_capacity(entries.len());
        for (m, dest) in entries.drain(..) {
            keyed.push((level.vector(dest)?.index(), m));
        }
        keyed.sort_by_key(|&(index, _)| index);
        let order: Vec<_> = keyed.into_iter().map(|(_, m)| m).collect();
        level.set_off_diagonal_order(v, &order)?;
    }
    Ok(())
}
