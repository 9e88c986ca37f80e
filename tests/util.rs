#![allow(dead_code)]
use mesh_algebra::algebra::{AlgebraLevel, VectorId, VectorType};
use mesh_algebra::data::{AlgebraFormat, LevelConfig};
use mesh_algebra::topology::{PointId, StructuredQuadGrid};

pub fn pid(u: u64) -> PointId {
    PointId::new(u).unwrap()
}

pub fn scalar_level() -> AlgebraLevel {
    AlgebraLevel::new(AlgebraFormat::scalar_nodal(), LevelConfig::default())
}

/// `n` node vectors without topology entities, appended in order.
pub fn bare_vectors(lv: &mut AlgebraLevel, n: usize) -> Vec<VectorId> {
    (0..n)
        .map(|_| {
            lv.create_vector(lv.last_vector(), VectorType::Node, None)
                .unwrap()
        })
        .collect()
}

/// Node vectors of an `n × n` node grid (`(n-1)²` elements), row-major.
pub fn node_grid(n: usize) -> (StructuredQuadGrid, AlgebraLevel) {
    let mut grid = StructuredQuadGrid::new(n - 1, n - 1, 1.0).unwrap();
    let mut lv = scalar_level();
    grid.insert_vectors(&mut lv).unwrap();
    (grid, lv)
}

/// Vector on node `(i, j)` of the grid.
pub fn node_vector(grid: &StructuredQuadGrid, i: usize, j: usize) -> VectorId {
    grid.vector_of(grid.node(i, j).unwrap()).unwrap()
}

/// Couples every node to its right and upper neighbour.
pub fn four_point_stencil(grid: &StructuredQuadGrid, lv: &mut AlgebraLevel) {
    for j in 0..=grid.ny() {
        for i in 0..=grid.nx() {
            let v = node_vector(grid, i, j);
            lv.create_connection(v, v).unwrap();
            if i < grid.nx() {
                lv.create_connection(v, node_vector(grid, i + 1, j)).unwrap();
            }
            if j < grid.ny() {
                lv.create_connection(v, node_vector(grid, i, j + 1)).unwrap();
            }
        }
    }
}

/// Position of every vector in the current list.
pub fn positions(lv: &AlgebraLevel) -> hashbrown::HashMap<VectorId, usize> {
    lv.vector_ids()
        .into_iter()
        .enumerate()
        .map(|(i, v)| (v, i))
        .collect()
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}
