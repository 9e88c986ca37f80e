//! Partition builders over an ordered vector list.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra_error::AlgebraError;
use crate::block::description::{BlockDescription, BlockFormat};
use crate::block::tree::BlockvectorId;

/// Sub-blocks with at most this many points are not bisected further.
pub const HALFENING_LEAF_POINTS: usize = 9;

/// Splits the first `points` vectors of the list into leaves of
/// `points_per_stripe` consecutive vectors; returns the number of stripes.
///
/// Every spanned vector receives a one-level path naming its stripe.
pub fn create_stripe_partition(
    level: &mut AlgebraLevel,
    points: usize,
    points_per_stripe: usize,
) -> Result<usize, AlgebraError> {
    if points_per_stripe == 0 {
        return Err(AlgebraError::OutOfRange("stripes need at least one point".into()));
    }
    let ids = level.vector_ids();
    if ids.len() < points {
        return Err(AlgebraError::inconsistency(format!(
            "stripe partition of {points} points over {} vectors",
            ids.len()
        )));
    }
    if ids.len() > points {
        log::warn!(
            "create_stripe_partition: {} trailing vectors stay outside any stripe",
            ids.len() - points
        );
    }
    level.clear_blockvectors();
    let stripes = points.div_ceil(points_per_stripe);
    let format = BlockFormat::new((stripes as u64).max(2))?;
    level.blocks.format = Some(format.clone());

    for (stripe, run) in ids[..points].chunks(points_per_stripe).enumerate() {
        let mut desc = BlockDescription::new();
        desc.push_entry(stripe as u64, &format)?;
        let bv = level
            .blocks
            .create(&mut level.heap, None, stripe as u64, true, desc)?;
        level.blocks.set_span(bv, run)?;
        for &v in run {
            level.vector_mut(v)?.block = desc;
        }
    }
    log::debug!(
        "create_stripe_partition: {stripes} stripes of {points_per_stripe} on level {}",
        level.level()
    );
    Ok(stripes)
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    vector: VectorId,
    row: usize,
    col: usize,
}

#[derive(Clone, Copy, Debug)]
struct Region {
    row0: usize,
    rows: usize,
    col0: usize,
    cols: usize,
}

/// Recursive bisection of a `side × side` grid whose vectors are listed in
/// row-major order.
///
/// Each step creates three children: 0 = left/bottom, 1 = right/top and
/// 2 = the cut line itself. Cuts alternate between vertical and horizontal,
/// starting vertical, and stop once a sub-block holds at most
/// [`HALFENING_LEAF_POINTS`] points. The vector list is relinked so every
/// leaf spans a contiguous run, then renumbered.
pub fn create_domain_halfening_partition(
    level: &mut AlgebraLevel,
    side: usize,
) -> Result<(), AlgebraError> {
    let ids = level.vector_ids();
    if side == 0 || ids.len() != side * side {
        return Err(AlgebraError::inconsistency(format!(
            "domain halfening of a {side}x{side} grid over {} vectors",
            ids.len()
        )));
    }
    level.clear_blockvectors();
    let format = BlockFormat::new(3)?;
    level.blocks.format = Some(format.clone());

    let cells: Vec<Cell> = ids
        .iter()
        .enumerate()
        .map(|(k, &vector)| Cell {
            vector,
            row: k / side,
            col: k % side,
        })
        .collect();
    let region = Region {
        row0: 0,
        rows: side,
        col0: 0,
        cols: side,
    };
    let mut order = Vec::with_capacity(ids.len());
    halfen(
        level,
        &format,
        None,
        cells,
        region,
        true,
        BlockDescription::new(),
        &mut order,
    )?;
    level.relink_keep_blocks(&order)?;
    level.renumber()?;
    log::debug!(
        "create_domain_halfening_partition: {} blockvectors for side {side}",
        level.blocks.len()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn halfen(
    level: &mut AlgebraLevel,
    format: &BlockFormat,
    parent: Option<BlockvectorId>,
    cells: Vec<Cell>,
    region: Region,
    vertical: bool,
    path: BlockDescription,
    order: &mut Vec<VectorId>,
) -> Result<(), AlgebraError> {
    let cut = if vertical {
        region.col0 + region.cols.saturating_sub(1) / 2
    } else {
        region.row0 + region.rows.saturating_sub(1) / 2
    };
    let (mut low, mut high, mut interface) = (Vec::new(), Vec::new(), Vec::new());
    for cell in cells {
        let coord = if vertical { cell.col } else { cell.row };
        match coord.cmp(&cut) {
            std::cmp::Ordering::Less => low.push(cell),
            std::cmp::Ordering::Greater => high.push(cell),
            std::cmp::Ordering::Equal => interface.push(cell),
        }
    }
    let (low_region, high_region) = if vertical {
        (
            Region {
                cols: cut - region.col0,
                ..region
            },
            Region {
                col0: cut + 1,
                cols: (region.col0 + region.cols).saturating_sub(cut + 1),
                ..region
            },
        )
    } else {
        (
            Region {
                rows: cut - region.row0,
                ..region
            },
            Region {
                row0: cut + 1,
                rows: (region.row0 + region.rows).saturating_sub(cut + 1),
                ..region
            },
        )
    };

    let parts = [
        (0u64, low, Some(low_region)),
        (1, high, Some(high_region)),
        (2, interface, None),
    ];
    for (number, part, sub_region) in parts {
        let mut desc = path;
        desc.push_entry(number, format)?;
        let leaf = sub_region.is_none() || part.len() <= HALFENING_LEAF_POINTS;
        let bv = level
            .blocks
            .create(&mut level.heap, parent, number, leaf, desc)?;
        let start = order.len();
        match sub_region {
            Some(sub) if !leaf => {
                halfen(level, format, Some(bv), part, sub, !vertical, desc, order)?;
            }
            _ => {
                for cell in &part {
                    level.vector_mut(cell.vector)?.block = desc;
                    order.push(cell.vector);
                }
            }
        }
        level.blocks.set_span(bv, &order[start..])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::vector::VectorType;
    use crate::data::format::{AlgebraFormat, LevelConfig};

    fn line(n: usize) -> (AlgebraLevel, Vec<VectorId>) {
        let mut lv = AlgebraLevel::new(AlgebraFormat::scalar_nodal(), LevelConfig::default());
        let mut prev = None;
        let mut ids = Vec::new();
        for _ in 0..n {
            let v = lv.create_vector(prev, VectorType::Node, None).unwrap();
            ids.push(v);
            prev = Some(v);
        }
        (lv, ids)
    }

    #[test]
    fn stripes_cover_prefix_with_short_tail() {
        let (mut lv, ids) = line(10);
        let n = create_stripe_partition(&mut lv, 10, 4).unwrap();
        assert_eq!(n, 3);
        let leaves = lv.blockvectors().leaves();
        assert_eq!(leaves.len(), 3);
        let spans: Vec<usize> = leaves
            .iter()
            .map(|&bv| lv.block_vectors(bv).unwrap().len())
            .collect();
        assert_eq!(spans, vec![4, 4, 2]);
        let fmt = lv.blockvectors().format().unwrap().clone();
        assert_eq!(lv.vector(ids[9]).unwrap().block().entry(0, &fmt), Some(2));
    }

    #[test]
    fn stripes_reject_short_list() {
        let (mut lv, _) = line(3);
        assert!(matches!(
            create_stripe_partition(&mut lv, 5, 2),
            Err(AlgebraError::Inconsistency(_))
        ));
    }

    #[test]
    fn halfening_recurses_above_nine_points() {
        let (mut lv, _) = line(49);
        create_domain_halfening_partition(&mut lv, 7).unwrap();
        let tree = lv.blockvectors();
        let top: Vec<_> = tree.children(None).collect();
        assert_eq!(top.len(), 3);
        // 7 columns: cut at column 3, halves are 3x7 = 21 points each
        assert!(!top[0].1.is_leaf());
        assert!(!top[1].1.is_leaf());
        assert!(top[2].1.is_leaf());
        assert_eq!(top[2].1.vector_count(), 7);
        let total: usize = tree
            .leaves()
            .iter()
            .map(|&bv| tree.get(bv).unwrap().vector_count())
            .sum();
        assert_eq!(total, 49);
    }
}
