mod util;
use hashbrown::HashMap;
use mesh_algebra::algebra::stencil::create_connections;
use mesh_algebra::algebra::{AlgebraLevel, VectorId};
use mesh_algebra::algebra_error::AlgebraError;
use mesh_algebra::algs::lex::ORDERRES;
use mesh_algebra::algs::{
    AxisKey, FlowDependency, GreedyFeedback, LexOrderOpts, Rotation, SkipPlacement,
    StreamwiseLayout, StreamwiseOpts, StreamwiseOrder, lex_order, order_matrices,
    order_vectors_algebraic, shell_order,
};
use mesh_algebra::topology::ElementTopology;
use mesh_algebra::DebugInvariants;
use std::collections::VecDeque;
use util::*;

fn mark_down(lv: &mut AlgebraLevel, from: VectorId, to: VectorId) {
    let m = lv.get_matrix(from, to).unwrap();
    lv.matrix_mut(m).unwrap().set_down(true);
}

/// Every down entry `A → B` with neither end cut has `B` before `A`.
fn assert_downwind(lv: &AlgebraLevel, cut: &[VectorId]) {
    let pos = positions(lv);
    for (a, _) in lv.vectors() {
        for (_, mat) in lv.off_diagonal(a) {
            let b = mat.dest();
            if mat.is_down() && !cut.contains(&a) && !cut.contains(&b) {
                assert!(pos[&b] <= pos[&a], "{b:?} must precede {a:?}");
            }
        }
    }
}

#[test]
fn row_major_grid_is_a_lex_fixed_point() {
    let (grid, mut lv) = node_grid(3);
    create_connections(&mut lv, &grid, grid.elements()).unwrap();
    let before = lv.vector_ids();
    let opts = LexOrderOpts {
        axes: vec![AxisKey::ascending(0), AxisKey::ascending(1)],
        ..LexOrderOpts::default()
    };
    lex_order(&mut lv, &grid, &opts).unwrap();
    assert_eq!(lv.vector_ids(), before);
    for (i, (_, v)) in lv.vectors().enumerate() {
        assert_eq!(v.index(), i);
    }
    lv.validate_invariants().unwrap();
}

#[test]
fn lex_axes_and_directions_are_honoured() {
    let (grid, mut lv) = node_grid(3);
    let opts = LexOrderOpts {
        axes: vec![AxisKey::descending(1), AxisKey::ascending(0)],
        ..LexOrderOpts::default()
    };
    lex_order(&mut lv, &grid, &opts).unwrap();
    // column-major, each column walked top to bottom
    let expect: Vec<_> = (0..3)
        .flat_map(|i| (0..3).rev().map(move |j| (i, j)))
        .map(|(i, j)| node_vector(&grid, i, j))
        .collect();
    assert_eq!(lv.vector_ids(), expect);
}

#[test]
fn lex_tolerance_merges_nearly_equal_rows() {
    let (grid, mut lv) = node_grid(3);
    let opts = LexOrderOpts {
        tolerance: 1.5,
        ..LexOrderOpts::default()
    };
    lex_order(&mut lv, &grid, &opts).unwrap();
    // coordinates 0 and 1 share a band on both axes; inside a cell the
    // insertion order survives
    let first_six: Vec<_> = lv.vector_ids().into_iter().take(6).collect();
    let expect: Vec<_> = [(0, 0), (1, 0), (0, 1), (1, 1), (2, 0), (2, 1)]
        .iter()
        .map(|&(i, j)| node_vector(&grid, i, j))
        .collect();
    assert_eq!(first_six, expect);
    assert_eq!(LexOrderOpts::default().tolerance, ORDERRES);
}

#[test]
fn lex_can_move_skip_vectors_to_the_end() {
    let (grid, mut lv) = node_grid(3);
    let boundary = node_vector(&grid, 0, 0);
    lv.set_skip(boundary, 1).unwrap();
    let opts = LexOrderOpts {
        skip: SkipPlacement::Last,
        ..LexOrderOpts::default()
    };
    lex_order(&mut lv, &grid, &opts).unwrap();
    assert_eq!(lv.last_vector(), Some(boundary));
    assert_eq!(lv.first_vector(), Some(node_vector(&grid, 1, 0)));
}

#[test]
fn lex_rejects_unknown_axes() {
    let (grid, mut lv) = node_grid(2);
    let before = lv.vector_ids();
    let opts = LexOrderOpts {
        axes: vec![AxisKey::ascending(3)],
        ..LexOrderOpts::default()
    };
    assert!(matches!(
        lex_order(&mut lv, &grid, &opts),
        Err(AlgebraError::OutOfRange(_))
    ));
    assert_eq!(lv.vector_ids(), before);
}

#[test]
fn matrices_follow_destination_index() {
    let (grid, mut lv) = node_grid(3);
    create_connections(&mut lv, &grid, grid.elements()).unwrap();
    lv.revert_order().unwrap();
    order_matrices(&mut lv).unwrap();
    for (v, _) in lv.vectors() {
        let idx: Vec<usize> = lv
            .off_diagonal(v)
            .map(|(_, m)| lv.vector(m.dest()).unwrap().index())
            .collect();
        assert!(idx.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn cycle_is_broken_by_a_cut_region() {
    let mut lv = scalar_level();
    let ids = bare_vectors(&mut lv, 4);
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
    for (x, y) in [(a, b), (b, c), (c, a)] {
        lv.create_connection(x, y).unwrap();
    }
    let mut label = |lv: &mut AlgebraLevel| {
        mark_down(lv, a, b);
        mark_down(lv, b, c);
        mark_down(lv, c, a);
        Ok::<_, AlgebraError>(())
    };
    let report = order_vectors_algebraic(&mut lv, &mut label, &StreamwiseOpts::default()).unwrap();
    assert_eq!(report.visited(), 4);
    assert!(report.cut() >= 1);
    assert_eq!(report.first + report.last, 1);
    let order = lv.vector_ids();
    assert!(order[0] == d || order[3] == d);
    assert_downwind(&lv, &report.cut_vectors);
}

#[test]
fn flow_aligned_grid_needs_no_cut() {
    let (grid, mut lv) = node_grid(5);
    four_point_stencil(&grid, &mut lv);
    lv.revert_order().unwrap();
    let report = StreamwiseOrder::new(FlowDependency::new(&grid, [1.0, 0.5, 0.0]))
        .run(&mut lv)
        .unwrap();
    assert_eq!(report.cut(), 0);
    assert_eq!(report.visited(), 25);
    assert_downwind(&lv, &[]);
    // the inflow corner leads
    assert_eq!(lv.first_vector(), Some(node_vector(&grid, 0, 0)));
    assert_eq!(lv.last_vector(), Some(node_vector(&grid, 4, 4)));
    lv.validate_invariants().unwrap();
}

#[test]
fn greedy_cut_with_remainder_layout_stays_downwind() {
    let (grid, mut lv) = node_grid(4);
    four_point_stencil(&grid, &mut lv);
    // a recirculating flow: clockwise around the centre
    let centre = [1.5, 1.5];
    let labels: Vec<(VectorId, VectorId)> = lv
        .vectors()
        .flat_map(|(v, _)| {
            lv.off_diagonal(v)
                .map(move |(_, m)| (v, m.dest()))
                .collect::<Vec<_>>()
        })
        .collect();
    let coords: HashMap<VectorId, [f64; 2]> = (0..4)
        .flat_map(|i| (0..4).map(move |j| (i, j)))
        .map(|(i, j)| (node_vector(&grid, i, j), [i as f64, j as f64]))
        .collect();
    let report = StreamwiseOrder::new(move |lv: &mut AlgebraLevel| {
        for &(from, to) in &labels {
            let p = coords[&from];
            let q = coords[&to];
            // velocity at p rotates clockwise about the centre
            let vel = [p[1] - centre[1], centre[0] - p[0]];
            let along = (q[0] - p[0]) * vel[0] + (q[1] - p[1]) * vel[1];
            if along < 0.0 {
                mark_down(lv, from, to);
            }
        }
        Ok::<_, AlgebraError>(())
    })
    .cut_set(GreedyFeedback)
    .layout(StreamwiseLayout::FirstCutRemainder)
    .circular(&grid, Rotation::CounterClockwise)
    .run(&mut lv)
    .unwrap();
    assert_eq!(report.visited(), 16);
    assert!(report.cut() >= 1);
    assert_downwind(&lv, &report.cut_vectors);
    lv.validate_invariants().unwrap();
}

fn bfs_distance(lv: &AlgebraLevel, seed: VectorId) -> HashMap<VectorId, usize> {
    let mut dist = HashMap::new();
    dist.insert(seed, 0usize);
    let mut queue = VecDeque::from([seed]);
    while let Some(v) = queue.pop_front() {
        let d = dist[&v];
        for (m, mat) in lv.off_diagonal(v) {
            if lv.connection(m.connection()).unwrap().is_extra() {
                continue;
            }
            if !dist.contains_key(&mat.dest()) {
                dist.insert(mat.dest(), d + 1);
                queue.push_back(mat.dest());
            }
        }
    }
    dist
}

#[test]
fn shells_grow_monotonically_from_the_seed() {
    let (grid, mut lv) = node_grid(5);
    four_point_stencil(&grid, &mut lv);
    let seed = node_vector(&grid, 2, 2);
    // fill-in does not shortcut the shells
    lv.create_extra_connection(seed, node_vector(&grid, 4, 4))
        .unwrap();
    shell_order(&mut lv, seed).unwrap();

    assert_eq!(lv.first_vector(), Some(seed));
    assert_eq!(lv.vector(seed).unwrap().index(), 1);
    let dist = bfs_distance(&lv, seed);
    assert_eq!(dist.len(), 25);
    let ids = lv.vector_ids();
    for w in ids.windows(2) {
        assert!(dist[&w[0]] <= dist[&w[1]]);
    }
    for (k, v) in ids.iter().enumerate() {
        assert_eq!(lv.vector(*v).unwrap().index(), k + 1);
    }
    assert_eq!(dist[&node_vector(&grid, 4, 4)], 4);
}

#[test]
fn shell_order_keeps_disconnected_levels_intact() {
    let mut lv = scalar_level();
    let ids = bare_vectors(&mut lv, 3);
    lv.create_connection(ids[0], ids[1]).unwrap();
    let before = lv.vector_ids();
    assert!(matches!(
        shell_order(&mut lv, ids[0]),
        Err(AlgebraError::Inconsistency(_))
    ));
    assert_eq!(lv.vector_ids(), before);
}

#[test]
fn revert_order_reverses_and_renumbers() {
    let mut lv = scalar_level();
    let mut ids = bare_vectors(&mut lv, 5);
    lv.revert_order().unwrap();
    ids.reverse();
    assert_eq!(lv.vector_ids(), ids);
    assert_eq!(lv.vector(ids[0]).unwrap().index(), 0);
}
