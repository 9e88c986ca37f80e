//! Vector classes for local coarsening and refinement passes.
//!
//! Seeds get class 3; propagation marks their matrix neighbours with class 2
//! and the neighbours of those with class 1. Extra connections do not carry
//! classes.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra::vector::class;
use crate::algebra_error::AlgebraError;
use crate::topology::access::ElementTopology;
use crate::topology::point::PointId;

/// Resets every vector to class 0.
pub fn clear_vector_classes(level: &mut AlgebraLevel) -> Result<(), AlgebraError> {
    for v in level.vector_ids() {
        level.vector_mut(v)?.class = class::UNTOUCHED;
    }
    Ok(())
}

/// Marks all vectors of `elements` as seeds; returns how many were marked.
pub fn seed_vector_classes<T, I>(
    level: &mut AlgebraLevel,
    topology: &T,
    elements: I,
) -> Result<usize, AlgebraError>
where
    T: ElementTopology + ?Sized,
    I: IntoIterator<Item = PointId>,
{
    let types: Vec<_> = level.format().vector_types().collect();
    let mut seeded = 0;
    for element in elements {
        for &vtype in &types {
            for v in topology.element_vectors(element, vtype) {
                let rec = level.vector_mut(v)?;
                if rec.class != class::SEED {
                    rec.class = class::SEED;
                    seeded += 1;
                }
            }
        }
    }
    Ok(seeded)
}

fn neighbors_of_class(level: &AlgebraLevel, of: u8) -> Vec<VectorId> {
    level
        .vectors()
        .filter(|(_, rec)| rec.class == of)
        .flat_map(|(v, _)| {
            level
                .off_diagonal(v)
                .filter(|(m, _)| {
                    level
                        .connection(m.connection())
                        .is_some_and(|con| !con.is_extra())
                })
                .map(|(_, mat)| mat.dest())
        })
        .collect()
}

/// Spreads classes from the seeds two matrix steps outward.
pub fn propagate_vector_classes(level: &mut AlgebraLevel) -> Result<(), AlgebraError> {
    for (from, to) in [(class::SEED, class::NEIGHBOR), (class::NEIGHBOR, class::OUTER)] {
        for v in neighbors_of_class(level, from) {
            let rec = level.vector_mut(v)?;
            if rec.class < to {
                rec.class = to;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::vector::VectorType;
    use crate::data::format::{AlgebraFormat, LevelConfig};

    #[test]
    fn classes_spread_two_rings() {
        let mut lv = AlgebraLevel::new(AlgebraFormat::scalar_nodal(), LevelConfig::default());
        let mut ids = Vec::new();
        let mut prev = None;
        for _ in 0..5 {
            let v = lv.create_vector(prev, VectorType::Node, None).unwrap();
            ids.push(v);
            prev = Some(v);
        }
        for w in ids.windows(2) {
            lv.create_connection(w[0], w[1]).unwrap();
        }
        clear_vector_classes(&mut lv).unwrap();
        lv.set_class(ids[0], class::SEED).unwrap();
        propagate_vector_classes(&mut lv).unwrap();
        let classes: Vec<u8> = ids.iter().map(|&v| lv.vector(v).unwrap().class()).collect();
        assert_eq!(classes, vec![3, 2, 1, 0, 0]);
    }

    #[test]
    fn extra_connections_do_not_spread() {
        let mut lv = AlgebraLevel::new(AlgebraFormat::scalar_nodal(), LevelConfig::default());
        let a = lv.create_vector(None, VectorType::Node, None).unwrap();
        let b = lv.create_vector(Some(a), VectorType::Node, None).unwrap();
        lv.create_extra_connection(a, b).unwrap();
        clear_vector_classes(&mut lv).unwrap();
        lv.set_class(a, class::SEED).unwrap();
        propagate_vector_classes(&mut lv).unwrap();
        assert_eq!(lv.vector(b).unwrap().class(), class::UNTOUCHED);
    }
}
