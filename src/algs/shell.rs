//! Shell ordering: breadth-first layers around a seed vector.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra_error::AlgebraError;
use std::collections::VecDeque;

/// Reorders the vector list breadth-first from `seed`.
///
/// Vectors are numbered `1, 2, …` in the order they are reached through
/// non-extra connections, so every vector of shell `k` precedes every vector
/// of shell `k + 1`. If the connection graph is disconnected the walk stops
/// short and the level is left untouched.
pub fn shell_order(level: &mut AlgebraLevel, seed: VectorId) -> Result<(), AlgebraError> {
    if !level.contains_vector(seed) {
        return Err(AlgebraError::OutOfRange(format!(
            "shell seed {seed:?} is not a vector of level {}",
            level.level()
        )));
    }
    level.clear_used();
    let mut order = Vec::with_capacity(level.vector_count());
    let mut queue = VecDeque::from([seed]);
    level.vector_mut(seed)?.used = true;

    while let Some(v) = queue.pop_front() {
        order.push(v);
        let reachable: Vec<VectorId> = level
            .off_diagonal(v)
            .filter(|(m, _)| {
                level
                    .connection(m.connection())
                    .is_some_and(|con| !con.is_extra())
            })
            .map(|(_, mat)| mat.dest())
            .collect();
        for w in reachable {
            let rec = level.vector_mut(w)?;
            if !rec.used {
                rec.used = true;
                queue.push_back(w);
            }
        }
    }
    level.clear_used();

    if order.len() != level.vector_count() {
        return Err(AlgebraError::inconsistency(format!(
            "shell walk from {seed:?} reached {} of {} vectors",
            order.len(),
            level.vector_count()
        )));
    }
    level.relink(&order)?;
    for (i, &v) in order.iter().enumerate() {
        level.vector_mut(v)?.index = i + 1;
    }
    crate::debug_invariants!(level.check_algebra(), "shell_order");
    log::debug!("shell_order: {} vectors from {seed:?}", order.len());
    Ok(())
}
