//! Structured quadrilateral grid acting as topology and geometry collaborator.
//!
//! Entities are numbered nodes first (row-major), then x-directed edges,
//! y-directed edges and finally elements, all starting at `PointId(1)`.
//! [`StructuredQuadGrid::insert_vectors`] creates one vector per entity for
//! every vector type the format gives components to.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra::vector::VectorType;
use crate::algebra_error::AlgebraError;
use crate::topology::access::{ElementTopology, Position, VectorGeometry};
use crate::topology::point::PointId;
use hashbrown::HashMap;

/// Decoded entity of a [`StructuredQuadGrid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridEntity {
    Node { i: usize, j: usize },
    /// Edge from node `(i, j)` to node `(i + 1, j)`.
    EdgeX { i: usize, j: usize },
    /// Edge from node `(i, j)` to node `(i, j + 1)`.
    EdgeY { i: usize, j: usize },
    Element { i: usize, j: usize },
}

/// `nx × ny` quadrilateral elements of width `h` on `[0, nx·h] × [0, ny·h]`.
#[derive(Clone, Debug)]
pub struct StructuredQuadGrid {
    nx: usize,
    ny: usize,
    h: f64,
    vectors: HashMap<PointId, VectorId>,
}

impl StructuredQuadGrid {
    pub fn new(nx: usize, ny: usize, h: f64) -> Result<Self, AlgebraError> {
        if nx == 0 || ny == 0 {
            return Err(AlgebraError::OutOfRange(format!(
                "structured grid needs at least one element per direction, got {nx}x{ny}"
            )));
        }
        if h.is_nan() || h <= 0.0 {
            return Err(AlgebraError::OutOfRange(format!("mesh width {h} must be positive")));
        }
        Ok(Self {
            nx,
            ny,
            h,
            vectors: HashMap::new(),
        })
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    fn node_count(&self) -> usize {
        (self.nx + 1) * (self.ny + 1)
    }

    fn edge_x_count(&self) -> usize {
        self.nx * (self.ny + 1)
    }

    fn edge_y_count(&self) -> usize {
        (self.nx + 1) * self.ny
    }

    fn element_base(&self) -> usize {
        self.node_count() + self.edge_x_count() + self.edge_y_count()
    }

    fn point(raw: usize) -> Option<PointId> {
        PointId::new(raw as u64 + 1).ok()
    }

    pub fn node(&self, i: usize, j: usize) -> Option<PointId> {
        (i <= self.nx && j <= self.ny)
            .then(|| Self::point(j * (self.nx + 1) + i))
            .flatten()
    }

    pub fn edge_x(&self, i: usize, j: usize) -> Option<PointId> {
        (i < self.nx && j <= self.ny)
            .then(|| Self::point(self.node_count() + j * self.nx + i))
            .flatten()
    }

    pub fn edge_y(&self, i: usize, j: usize) -> Option<PointId> {
        (i <= self.nx && j < self.ny)
            .then(|| Self::point(self.node_count() + self.edge_x_count() + j * (self.nx + 1) + i))
            .flatten()
    }

    pub fn element(&self, i: usize, j: usize) -> Option<PointId> {
        (i < self.nx && j < self.ny)
            .then(|| Self::point(self.element_base() + j * self.nx + i))
            .flatten()
    }

    /// Decodes a point of this grid.
    pub fn entity(&self, p: PointId) -> Option<GridEntity> {
        let mut raw = (p.get() - 1) as usize;
        if raw < self.node_count() {
            let w = self.nx + 1;
            return Some(GridEntity::Node { i: raw % w, j: raw / w });
        }
        raw -= self.node_count();
        if raw < self.edge_x_count() {
            return Some(GridEntity::EdgeX {
                i: raw % self.nx,
                j: raw / self.nx,
            });
        }
        raw -= self.edge_x_count();
        if raw < self.edge_y_count() {
            let w = self.nx + 1;
            return Some(GridEntity::EdgeY { i: raw % w, j: raw / w });
        }
        raw -= self.edge_y_count();
        (raw < self.nx * self.ny).then(|| GridEntity::Element {
            i: raw % self.nx,
            j: raw / self.nx,
        })
    }

    fn entities_of(&self, vtype: VectorType) -> Vec<PointId> {
        let mut out = Vec::new();
        match vtype {
            VectorType::Node => {
                for j in 0..=self.ny {
                    out.extend((0..=self.nx).filter_map(|i| self.node(i, j)));
                }
            }
            VectorType::Edge => {
                for j in 0..=self.ny {
                    out.extend((0..self.nx).filter_map(|i| self.edge_x(i, j)));
                }
                for j in 0..self.ny {
                    out.extend((0..=self.nx).filter_map(|i| self.edge_y(i, j)));
                }
            }
            // a 2D grid has no sides distinct from its edges
            VectorType::Side => {}
            VectorType::Element => {
                for j in 0..self.ny {
                    out.extend((0..self.nx).filter_map(|i| self.element(i, j)));
                }
            }
        }
        out
    }

    /// Appends one vector per entity to the end of the level's list, type by
    /// type, entities row-major; returns the number of vectors created.
    pub fn insert_vectors(&mut self, level: &mut AlgebraLevel) -> Result<usize, AlgebraError> {
        let types: Vec<VectorType> = level.format().vector_types().collect();
        let mut created = 0;
        for vtype in types {
            if vtype == VectorType::Side {
                log::warn!("insert_vectors: side vectors requested on a 2D grid, none created");
            }
            for entity in self.entities_of(vtype) {
                let v = level.create_vector(level.last_vector(), vtype, Some(entity))?;
                self.vectors.insert(entity, v);
                created += 1;
            }
        }
        Ok(created)
    }

    /// Vector living on `entity`, if one was inserted.
    pub fn vector_of(&self, entity: PointId) -> Option<VectorId> {
        self.vectors.get(&entity).copied()
    }

    fn element_entities(&self, element: PointId, vtype: VectorType) -> Vec<PointId> {
        let Some(GridEntity::Element { i, j }) = self.entity(element) else {
            return Vec::new();
        };
        match vtype {
            VectorType::Node => [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)]
                .into_iter()
                .filter_map(|(a, b)| self.node(a, b))
                .collect(),
            VectorType::Edge => [
                self.edge_x(i, j),
                self.edge_y(i + 1, j),
                self.edge_x(i, j + 1),
                self.edge_y(i, j),
            ]
            .into_iter()
            .flatten()
            .collect(),
            VectorType::Side => Vec::new(),
            VectorType::Element => vec![element],
        }
    }
}

impl ElementTopology for StructuredQuadGrid {
    fn elements(&self) -> Vec<PointId> {
        self.entities_of(VectorType::Element)
    }

    fn neighbors(&self, element: PointId) -> Vec<PointId> {
        let Some(GridEntity::Element { i, j }) = self.entity(element) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(4);
        if let Some(e) = j.checked_sub(1).and_then(|jm| self.element(i, jm)) {
            out.push(e);
        }
        out.extend(self.element(i + 1, j));
        out.extend(self.element(i, j + 1));
        if let Some(e) = i.checked_sub(1).and_then(|im| self.element(im, j)) {
            out.push(e);
        }
        out
    }

    fn element_vectors(&self, element: PointId, vtype: VectorType) -> Vec<VectorId> {
        self.element_entities(element, vtype)
            .into_iter()
            .filter_map(|p| self.vector_of(p))
            .collect()
    }
}

impl VectorGeometry for StructuredQuadGrid {
    fn dimension(&self) -> usize {
        2
    }

    fn position(&self, entity: PointId, _vtype: VectorType) -> Option<Position> {
        let h = self.h;
        let xy = match self.entity(entity)? {
            GridEntity::Node { i, j } => (i as f64, j as f64),
            GridEntity::EdgeX { i, j } => (i as f64 + 0.5, j as f64),
            GridEntity::EdgeY { i, j } => (i as f64, j as f64 + 0.5),
            GridEntity::Element { i, j } => (i as f64 + 0.5, j as f64 + 0.5),
        };
        Some([xy.0 * h, xy.1 * h, 0.0])
    }
}
