//! Collaborator interfaces the algebra layer consumes from the grid.
//!
//! The store never walks mesh topology itself. Stencil construction asks an
//! [`ElementTopology`] which vectors an element carries and which elements
//! neighbour it; orderings that need coordinates ask a [`VectorGeometry`].

use crate::algebra::VectorId;
use crate::algebra::vector::VectorType;
use crate::topology::point::PointId;

/// A position in up to three space dimensions; unused axes are zero.
pub type Position = [f64; 3];

/// Element-level view of a grid, as needed for connection construction.
pub trait ElementTopology {
    /// All elements of the grid level, in a deterministic order.
    fn elements(&self) -> Vec<PointId>;

    /// Elements sharing a side with `element`.
    fn neighbors(&self, element: PointId) -> Vec<PointId>;

    /// Vectors of type `vtype` associated with `element` (its nodes' vectors,
    /// its edges' vectors, ... or its own element vector).
    fn element_vectors(&self, element: PointId, vtype: VectorType) -> Vec<VectorId>;
}

/// Geometric placement of the entities vectors are attached to.
pub trait VectorGeometry {
    /// Space dimension (2 or 3).
    fn dimension(&self) -> usize;

    /// Position of a `vtype` vector living on `entity`: the node point, the
    /// edge midpoint, or the side/element centroid.
    fn position(&self, entity: PointId, vtype: VectorType) -> Option<Position>;
}

impl<T: ElementTopology + ?Sized> ElementTopology for &T {
    fn elements(&self) -> Vec<PointId> {
        (**self).elements()
    }
    fn neighbors(&self, element: PointId) -> Vec<PointId> {
        (**self).neighbors(element)
    }
    fn element_vectors(&self, element: PointId, vtype: VectorType) -> Vec<VectorId> {
        (**self).element_vectors(element, vtype)
    }
}

impl<T: VectorGeometry + ?Sized> VectorGeometry for &T {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }
    fn position(&self, entity: PointId, vtype: VectorType) -> Option<Position> {
        (**self).position(entity, vtype)
    }
}
