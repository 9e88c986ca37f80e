//! Geometric lexicographic ordering.
//!
//! Coordinates closer than the tolerance along an axis are treated as equal
//! and the comparison falls through to the next axis. The tolerance is
//! applied by grouping every axis into bands first, which keeps the sort key
//! a total order.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra_error::AlgebraError;
use crate::algs::{order_matrices, vector_position};
use crate::topology::access::VectorGeometry;
use serde::{Deserialize, Serialize};

/// Default tolerance below which two coordinates compare equal.
pub const ORDERRES: f64 = 1e-3;

/// One coordinate axis and its direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisKey {
    pub axis: usize,
    pub descending: bool,
}

impl AxisKey {
    pub const fn ascending(axis: usize) -> Self {
        Self {
            axis,
            descending: false,
        }
    }

    pub const fn descending(axis: usize) -> Self {
        Self {
            axis,
            descending: true,
        }
    }
}

/// Where skip-flagged (e.g. Dirichlet) vectors go.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipPlacement {
    /// Sorted with everybody else.
    #[default]
    InPlace,
    First,
    Last,
}

/// Options of [`lex_order`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LexOrderOpts {
    /// Axes from the fastest to the slowest varying one along the resulting
    /// list: `[x, y]` yields row-major order on a 2D grid.
    pub axes: Vec<AxisKey>,
    /// Width of a coordinate band. Bands are anchored on their smallest
    /// value, so jittered coordinates spanning more than `tolerance` in total
    /// fall into two bands even when neighbours are closer than `tolerance`.
    pub tolerance: f64,
    pub skip: SkipPlacement,
    /// Also sort each off-diagonal list by the new indices.
    pub reorder_matrices: bool,
}

impl Default for LexOrderOpts {
    fn default() -> Self {
        Self {
            axes: vec![AxisKey::ascending(0), AxisKey::ascending(1)],
            tolerance: ORDERRES,
            skip: SkipPlacement::InPlace,
            reorder_matrices: false,
        }
    }
}

/// Band number of every value: sorted values start a new band once they
/// exceed the band's first value by more than `tolerance`.
fn bands(values: &[f64], tolerance: f64) -> Vec<i64> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut out = vec![0i64; values.len()];
    let mut band = 0i64;
    let mut anchor = idx.first().map(|&i| values[i]);
    for &i in &idx {
        if let Some(start) = anchor {
            if values[i] - start > tolerance {
                band += 1;
                anchor = Some(values[i]);
            }
        }
        out[i] = band;
    }
    out
}

/// Reorders the level's vectors lexicographically by position.
///
/// The sort is stable, so vectors inside one tolerance cell keep their
/// relative order. Indices are reassigned from 0 in the new list order.
pub fn lex_order<G>(
    level: &mut AlgebraLevel,
    geometry: &G,
    opts: &LexOrderOpts,
) -> Result<(), AlgebraError>
where
    G: VectorGeometry + ?Sized,
{
    if let Some(bad) = opts.axes.iter().find(|key| key.axis >= 3) {
        return Err(AlgebraError::OutOfRange(format!(
            "lexicographic axis {} outside 0..3",
            bad.axis
        )));
    }
    if !(opts.tolerance >= 0.0) {
        return Err(AlgebraError::OutOfRange(format!(
            "negative ordering tolerance {}",
            opts.tolerance
        )));
    }
    let ids: Vec<VectorId> = level.vector_ids();
    let mut positions = Vec::with_capacity(ids.len());
    for &v in &ids {
        positions.push(vector_position(level, geometry, v)?);
    }

    // slowest axis first in the key
    let per_axis: Vec<Vec<i64>> = opts
        .axes
        .iter()
        .rev()
        .map(|key| {
            let values: Vec<f64> = positions.iter().map(|p| p[key.axis]).collect();
            let mut b = bands(&values, opts.tolerance);
            if key.descending {
                b.iter_mut().for_each(|x| *x = -*x);
            }
            b
        })
        .collect();

    let skip_rank = |i: usize| -> Result<u8, AlgebraError> {
        let skip = level.vector(ids[i])?.is_skip();
        Ok(match opts.skip {
            SkipPlacement::InPlace => 0,
            SkipPlacement::First => u8::from(!skip),
            SkipPlacement::Last => u8::from(skip),
        })
    };
    let mut keyed = Vec::with_capacity(ids.len());
    for i in 0..ids.len() {
        let key: Vec<i64> = per_axis.iter().map(|b| b[i]).collect();
        keyed.push((skip_rank(i)?, key, ids[i]));
    }
    keyed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    let order: Vec<VectorId> = keyed.into_iter().map(|(_, _, v)| v).collect();

    level.relink(&order)?;
    level.renumber()?;
    if opts.reorder_matrices {
        order_matrices(level)?;
    }
    crate::debug_invariants!(level.check_algebra(), "lex_order");
    log::debug!(
        "lex_order: {} vectors on level {}",
        order.len(),
        level.level()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_merge_within_tolerance() {
        let b = bands(&[0.0, 1.0, 0.0004, 1.0009, 2.0], 1e-3);
        assert_eq!(b, vec![0, 1, 0, 1, 2]);
    }

    #[test]
    fn bands_anchor_on_first_value() {
        // a chain of small steps does not collapse into one band
        let b = bands(&[0.0, 0.0008, 0.0016, 0.0024], 1e-3);
        assert_eq!(b, vec![0, 0, 1, 1]);
    }

    #[test]
    fn jittered_row_wider_than_tolerance_splits() {
        let b = bands(&[1.0006, 0.9995, 1.0004], ORDERRES);
        assert_eq!(b, vec![1, 0, 0]);
    }
}
