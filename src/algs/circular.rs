//! Rotational ordering of a vector's off-diagonal entries in 2D.

use crate::algebra::level::{AlgebraLevel, MatrixId, VectorId};
use crate::algebra_error::AlgebraError;
use crate::algs::vector_position;
use crate::topology::access::VectorGeometry;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Sense of rotation around a vector.
///
/// Both senses sort by the angle measured counter-clockwise from the positive
/// x axis in `[0, 2π)`: counter-clockwise puts the east neighbour first,
/// clockwise visits the same sequence backwards and puts it last.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// Sorts the off-diagonal list of `v` by the angle of each neighbour around
/// `v`. Entries at equal angles keep their relative order.
///
/// Geometries that are not two-dimensional leave the list unchanged.
pub fn order_adjacency_circular<G>(
    level: &mut AlgebraLevel,
    geometry: &G,
    v: VectorId,
    rotation: Rotation,
) -> Result<(), AlgebraError>
where
    G: VectorGeometry + ?Sized,
{
    if geometry.dimension() != 2 {
        log::trace!("circular ordering skipped in dimension {}", geometry.dimension());
        return Ok(());
    }
    let center = vector_position(level, geometry, v)?;
    let neighbours: Vec<(MatrixId, VectorId)> = level
        .off_diagonal(v)
        .map(|(m, mat)| (m, mat.dest()))
        .collect();
    let mut keyed = Vec::with_capacity(neighbours.len());
    for (m, dest) in neighbours {
        let p = vector_position(level, geometry, dest)?;
        let mut angle = (p[1] - center[1]).atan2(p[0] - center[0]);
        if angle < 0.0 {
            angle += TAU;
        }
        keyed.push((m, angle));
    }
    match rotation {
        Rotation::CounterClockwise => keyed.sort_by(|a, b| a.1.total_cmp(&b.1)),
        Rotation::Clockwise => keyed.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }
    let order: Vec<MatrixId> = keyed.into_iter().map(|(m, _)| m).collect();
    level.set_off_diagonal_order(v, &order)
}
