//! Depth-limited stencil construction across the element graph.
//!
//! The connection depth of a pair of vector types is a distance in the
//! *element adjacency graph*: depth 0 couples vectors of the same element,
//! depth 1 additionally couples vectors of face neighbours, and so on.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra::vector::VectorType;
use crate::algebra_error::AlgebraError;
use crate::topology::access::ElementTopology;
use crate::topology::point::PointId;
use hashbrown::HashMap;
use itertools::iproduct;
use std::collections::VecDeque;

/// Couples the vectors of elements `a` and `b` for every type pair whose
/// required depth is at least `depth`; returns the number of new connections.
///
/// Type pairs without a defined interaction are skipped. Re-running is
/// harmless: existing connections are reused.
pub fn build_stencil<T>(
    level: &mut AlgebraLevel,
    topology: &T,
    a: PointId,
    b: PointId,
    depth: u32,
) -> Result<usize, AlgebraError>
where
    T: ElementTopology + ?Sized,
{
    let before = level.connection_count();
    let types: Vec<VectorType> = level.format().vector_types().collect();
    for (&ta, &tb) in iproduct!(types.iter(), types.iter()) {
        match level.format().connection_depth(ta, tb) {
            Some(required) if required >= depth => {}
            _ => continue,
        }
        let from = topology.element_vectors(a, ta);
        let to = topology.element_vectors(b, tb);
        for (&u, &v) in iproduct!(from.iter(), to.iter()) {
            match level.create_connection(u, v) {
                Ok(_) => {}
                Err(e) if e.is_configuration() => continue,
                Err(e) => return Err(e),
            }
        }
    }
    let created = level.connection_count() - before;
    log::trace!("build_stencil: {a} <-> {b} at depth {depth}: {created} new connections");
    Ok(created)
}

/// Builds the stencil of `seed` against every element within `max_depth`
/// element-graph steps.
///
/// Neighbours are visited breadth first, so every element is processed once,
/// at its minimal distance from the seed.
pub fn propagate_from_neighborhood<T>(
    level: &mut AlgebraLevel,
    topology: &T,
    seed: PointId,
    max_depth: u32,
) -> Result<usize, AlgebraError>
where
    T: ElementTopology + ?Sized,
{
    let mut visited: HashMap<PointId, u32> = HashMap::new();
    let mut queue = VecDeque::from([(seed, 0u32)]);
    visited.insert(seed, 0);
    let mut created = 0;
    while let Some((element, distance)) = queue.pop_front() {
        created += build_stencil(level, topology, seed, element, distance)?;
        if distance >= max_depth {
            continue;
        }
        for neighbor in topology.neighbors(element) {
            if !visited.contains_key(&neighbor) {
                visited.insert(neighbor, distance + 1);
                queue.push_back((neighbor, distance + 1));
            }
        }
    }
    Ok(created)
}

fn element_vector_ids<T>(level: &AlgebraLevel, topology: &T, element: PointId) -> Vec<VectorId>
where
    T: ElementTopology + ?Sized,
{
    level
        .format()
        .vector_types()
        .flat_map(|vtype| topology.element_vectors(element, vtype))
        .collect()
}

/// Builds the full stencil of each element in `elements` and clears the
/// build flag of their vectors; returns the number of new connections.
pub fn create_connections<T, I>(
    level: &mut AlgebraLevel,
    topology: &T,
    elements: I,
) -> Result<usize, AlgebraError>
where
    T: ElementTopology + ?Sized,
    I: IntoIterator<Item = PointId>,
{
    let Some(max_depth) = level.format().max_connection_depth() else {
        return Ok(0);
    };
    let mut created = 0;
    let mut touched = Vec::new();
    for element in elements {
        created += propagate_from_neighborhood(level, topology, element, max_depth)?;
        touched.extend(element_vector_ids(level, topology, element));
    }
    for v in touched {
        level.vector_mut(v)?.build_connections = false;
    }
    log::debug!(
        "create_connections: {created} new connections on level {} ({} total)",
        level.level(),
        level.connection_count()
    );
    Ok(created)
}

/// Rebuilds connections only around elements owning a vector whose build
/// flag is set (e.g. after refinement inserted new vectors).
pub fn create_connections_where_needed<T>(
    level: &mut AlgebraLevel,
    topology: &T,
) -> Result<usize, AlgebraError>
where
    T: ElementTopology + ?Sized,
{
    let pending: Vec<PointId> = topology
        .elements()
        .into_iter()
        .filter(|&e| {
            element_vector_ids(level, topology, e)
                .into_iter()
                .any(|v| level.vector(v).is_ok_and(|rec| rec.needs_connections()))
        })
        .collect();
    create_connections(level, topology, pending)
}
