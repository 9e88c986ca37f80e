mod util;
use mesh_algebra::algebra::AlgebraLevel;
use mesh_algebra::algebra_error::AlgebraError;
use mesh_algebra::block::{
    BlockDescription, create_domain_halfening_partition, create_stripe_partition,
};
use mesh_algebra::DebugInvariants;
use util::*;

/// Leaves' spans concatenated in leaf order.
fn leaf_cover(lv: &AlgebraLevel) -> Vec<mesh_algebra::algebra::VectorId> {
    lv.blockvectors()
        .leaves()
        .into_iter()
        .flat_map(|bv| lv.block_vectors(bv).unwrap())
        .collect()
}

#[test]
fn stripes_cover_the_list_in_order() {
    let mut lv = scalar_level();
    let ids = bare_vectors(&mut lv, 10);
    let stripes = create_stripe_partition(&mut lv, 10, 4).unwrap();
    assert_eq!(stripes, 3);
    assert_eq!(leaf_cover(&lv), ids);
    let sizes: Vec<usize> = lv
        .blockvectors()
        .leaves()
        .into_iter()
        .map(|bv| lv.blockvectors().get(bv).unwrap().vector_count())
        .collect();
    assert_eq!(sizes, vec![4, 4, 2]);
}

#[test]
fn stripe_paths_name_their_stripe() {
    let mut lv = scalar_level();
    let ids = bare_vectors(&mut lv, 6);
    create_stripe_partition(&mut lv, 6, 2).unwrap();
    let tree = lv.blockvectors();
    let format = tree.format().unwrap();
    let path = *lv.vector(ids[3]).unwrap().block();
    assert_eq!(path.current(), 1);
    assert_eq!(path.entry(0, format), Some(1));
    let bv = tree.find(&path).unwrap();
    assert!(lv.block_vectors(bv).unwrap().contains(&ids[3]));
}

#[test]
fn stripes_over_a_short_list_fail() {
    let mut lv = scalar_level();
    bare_vectors(&mut lv, 3);
    assert!(matches!(
        create_stripe_partition(&mut lv, 5, 2),
        Err(AlgebraError::Inconsistency(_))
    ));
}

#[test]
fn three_by_three_halfening_is_a_single_split() {
    let (_grid, mut lv) = node_grid(3);
    let ids = lv.vector_ids();
    create_domain_halfening_partition(&mut lv, 3).unwrap();

    let tree = lv.blockvectors();
    let top: Vec<_> = tree.children(None).collect();
    assert_eq!(top.len(), 3);
    assert!(top.iter().all(|(_, bv)| bv.is_leaf()));
    assert_eq!(
        top.iter().map(|(_, bv)| bv.number()).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(tree.len(), 3);

    // left column, right column, then the cut line
    let expect: Vec<_> = [0, 3, 6, 2, 5, 8, 1, 4, 7].iter().map(|&k| ids[k]).collect();
    assert_eq!(leaf_cover(&lv), expect);
    assert_eq!(lv.vector_ids(), expect);
    assert_eq!(lv.vector(ids[4]).unwrap().index(), 7);
}

#[test]
fn larger_halfening_covers_every_vector_once() {
    let (_grid, mut lv) = node_grid(8);
    let ids = lv.vector_ids();
    create_domain_halfening_partition(&mut lv, 8).unwrap();
    let cover = leaf_cover(&lv);
    assert_eq!(cover, lv.vector_ids());
    assert_permutation(&cover, &ids);

    let tree = lv.blockvectors();
    assert!(tree.leaves().len() > 3);
    for bv in tree.leaves() {
        let node = tree.get(bv).unwrap();
        // interface leaves stay on the cut line, other leaves are small
        if node.number() != 2 {
            assert!(node.vector_count() <= 9);
        }
        for v in lv.block_vectors(bv).unwrap() {
            assert_eq!(lv.vector(v).unwrap().block(), node.description());
        }
    }
}

#[test]
fn halfening_rejects_non_square_lists() {
    let mut lv = scalar_level();
    bare_vectors(&mut lv, 8);
    assert!(create_domain_halfening_partition(&mut lv, 3).is_err());
    assert!(lv.blockvectors().is_empty());
}

#[test]
fn disposing_a_partitioned_vector_drops_the_partition() {
    let mut lv = scalar_level();
    let ids = bare_vectors(&mut lv, 4);
    create_stripe_partition(&mut lv, 4, 2).unwrap();
    lv.dispose_vector(ids[1]).unwrap();
    assert!(lv.blockvectors().is_empty());
    assert!(lv.vector(ids[0]).unwrap().block().is_empty());
    assert_eq!(
        lv.blockvectors().find(&BlockDescription::new()),
        Err(AlgebraError::NotFound("level has no block partition".into()))
    );
}

#[test]
fn reordering_drops_a_stale_partition() {
    let mut lv = scalar_level();
    let ids = bare_vectors(&mut lv, 4);
    create_stripe_partition(&mut lv, 4, 2).unwrap();
    assert_eq!(lv.blockvectors().leaves().len(), 2);
    lv.revert_order().unwrap();
    assert!(lv.blockvectors().is_empty());
    assert!(lv.vectors().all(|(_, v)| v.block().is_empty()));

    create_stripe_partition(&mut lv, 4, 2).unwrap();
    lv.move_vector(ids[0], None).unwrap();
    assert!(lv.blockvectors().is_empty());
    lv.validate_invariants().unwrap();
}

#[test]
fn halfening_keeps_its_own_relinked_partition() {
    let (_grid, mut lv) = node_grid(4);
    create_domain_halfening_partition(&mut lv, 4).unwrap();
    assert!(!lv.blockvectors().is_empty());
    assert_eq!(leaf_cover(&lv), lv.vector_ids());
}

#[test]
fn path_below_a_leaf_is_inconsistent() {
    let mut lv = scalar_level();
    let ids = bare_vectors(&mut lv, 4);
    create_stripe_partition(&mut lv, 4, 2).unwrap();
    let tree = lv.blockvectors();
    let format = tree.format().unwrap().clone();
    let mut path = *lv.vector(ids[2]).unwrap().block();
    path.push_entry(0, &format).unwrap();
    assert!(matches!(
        tree.find(&path),
        Err(AlgebraError::Inconsistency(_))
    ));
}
