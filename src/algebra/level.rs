//! [`AlgebraLevel`]: vectors, matrices and connections of one grid level.
//!
//! The level owns the record pools, the doubly linked vector list and the
//! per-vector adjacency lists. All mutation goes through `&mut self`; a level
//! is never shared between threads while it is being modified, but distinct
//! levels are independent values.

pub use crate::algebra::matrix::{ConnectionId, MatrixId};
pub use crate::algebra::vector::VectorId;

use crate::algebra::matrix::{Connection, ConnectionKind, Matrix};
use crate::algebra::vector::{Vector, VectorType};
use crate::algebra_error::AlgebraError;
use crate::block::tree::BlockvectorTree;
use crate::data::format::{AlgebraFormat, LevelConfig};
use crate::data::pool::{Heap, RecordPool};
use crate::topology::point::PointId;
use hashbrown::HashSet;
use std::mem::size_of;

fn not_in_level(v: VectorId) -> AlgebraError {
    AlgebraError::OutOfRange(format!("vector {v:?} is not a member of this level"))
}

/// Connectivity store of one grid level.
#[derive(Clone, Debug)]
pub struct AlgebraLevel {
    config: LevelConfig,
    format: AlgebraFormat,
    pub(crate) heap: Heap,
    pub(crate) vectors: RecordPool<VectorType, Vector>,
    pub(crate) connections: RecordPool<ConnectionKind, Connection>,
    pub(crate) blocks: BlockvectorTree,
    first: Option<VectorId>,
    last: Option<VectorId>,
    nvec: usize,
}

impl AlgebraLevel {
    /// Creates an empty level for `format`.
    pub fn new(format: AlgebraFormat, config: LevelConfig) -> Self {
        let heap = Heap::new(config.heap_bytes);
        Self {
            config,
            format,
            heap,
            vectors: RecordPool::new(),
            connections: RecordPool::new(),
            blocks: BlockvectorTree::default(),
            first: None,
            last: None,
            nvec: 0,
        }
    }

    /// Grid level number.
    #[inline]
    pub fn level(&self) -> i32 {
        self.config.level
    }

    #[inline]
    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    #[inline]
    pub fn format(&self) -> &AlgebraFormat {
        &self.format
    }

    /// Heap budget shared by all pools of the level.
    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Changes the heap budget, e.g. to resume work after
    /// [`AlgebraError::OutOfMemory`].
    pub fn set_heap_limit(&mut self, limit: Option<usize>) {
        log::debug!("level {}: heap limit set to {limit:?}", self.level());
        self.heap.set_limit(limit);
    }

    /// Number of vectors in the level list.
    #[inline]
    pub fn vector_count(&self) -> usize {
        self.nvec
    }

    /// Number of live connections (diagonal and paired).
    #[inline]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of directed matrix entries.
    pub fn matrix_count(&self) -> usize {
        self.connections
            .iter()
            .map(|(_, con)| con.matrices.len())
            .sum()
    }

    #[inline]
    pub fn first_vector(&self) -> Option<VectorId> {
        self.first
    }

    #[inline]
    pub fn last_vector(&self) -> Option<VectorId> {
        self.last
    }

    #[inline]
    pub fn contains_vector(&self, v: VectorId) -> bool {
        self.vectors.contains(v)
    }

    /// Shared access to a vector of this level.
    pub fn vector(&self, v: VectorId) -> Result<&Vector, AlgebraError> {
        self.vectors.get(v).ok_or_else(|| not_in_level(v))
    }

    /// Exclusive access to a vector of this level.
    pub fn vector_mut(&mut self, v: VectorId) -> Result<&mut Vector, AlgebraError> {
        self.vectors.get_mut(v).ok_or_else(|| not_in_level(v))
    }

    /// Vectors in list order.
    pub fn vectors(&self) -> VectorIter<'_> {
        VectorIter {
            level: self,
            cursor: self.first,
            forward: true,
        }
    }

    /// Vectors in reverse list order.
    pub fn vectors_rev(&self) -> VectorIter<'_> {
        VectorIter {
            level: self,
            cursor: self.last,
            forward: false,
        }
    }

    /// Vector handles in list order.
    pub fn vector_ids(&self) -> Vec<VectorId> {
        self.vectors().map(|(id, _)| id).collect()
    }

    /// Set the skip bits of a vector.
    pub fn set_skip(&mut self, v: VectorId, skip: u32) -> Result<(), AlgebraError> {
        self.vector_mut(v)?.skip = skip;
        Ok(())
    }

    /// Set the class of a vector (0..=3).
    pub fn set_class(&mut self, v: VectorId, class: u8) -> Result<(), AlgebraError> {
        if class > crate::algebra::vector::class::SEED {
            return Err(AlgebraError::OutOfRange(format!("vector class {class} > 3")));
        }
        self.vector_mut(v)?.class = class;
        Ok(())
    }

    fn vector_bytes(&self, vtype: VectorType) -> usize {
        size_of::<Vector>() + self.format.components(vtype) * size_of::<f64>()
    }

    /// Inserts a zero-initialized vector right after `after`, or at the head
    /// of the list when `after` is `None`.
    pub fn create_vector(
        &mut self,
        after: Option<VectorId>,
        vtype: VectorType,
        object: Option<PointId>,
    ) -> Result<VectorId, AlgebraError> {
        if let Some(a) = after {
            self.vector(a)?;
        }
        let bytes = self.vector_bytes(vtype);
        let record = Vector::new(vtype, object, self.format.components(vtype));
        let id = self.vectors.acquire(&mut self.heap, vtype, bytes, record)?;
        self.link_after(id, after)?;
        self.vector_mut(id)?.index = self.nvec - 1;
        Ok(id)
    }

    /// Removes every connection of `v`, unlinks it and returns it to the pool.
    pub fn dispose_vector(&mut self, v: VectorId) -> Result<(), AlgebraError> {
        let vec = self.vector(v)?;
        let mut cons: Vec<ConnectionId> = vec.diag.map(MatrixId::connection).into_iter().collect();
        cons.extend(self.off_diagonal(v).map(|(m, _)| m.connection()));
        let had_block = !vec.block.is_empty();
        for c in cons {
            self.dispose_connection(c)?;
        }
        self.unlink(v)?;
        self.vectors.release(v)?;
        if had_block && !self.blocks.is_empty() {
            log::debug!("dispose_vector: dropping block partition of level {}", self.level());
            self.clear_blockvectors();
        }
        Ok(())
    }

    /// Moves `v` right after `after` (or to the head when `None`).
    pub fn move_vector(&mut self, v: VectorId, after: Option<VectorId>) -> Result<(), AlgebraError> {
        self.vector(v)?;
        if let Some(a) = after {
            self.vector(a)?;
            if a == v {
                return Err(AlgebraError::OutOfRange(
                    "cannot move a vector after itself".into(),
                ));
            }
        }
        self.unlink(v)?;
        self.link_after(v, after)?;
        self.drop_stale_partition("move_vector");
        Ok(())
    }

    /// Leaf spans name ranges of the vector list, so any reorder outside a
    /// partition builder invalidates the tree.
    fn drop_stale_partition(&mut self, caller: &str) {
        if !self.blocks.is_empty() {
            log::debug!("{caller}: dropping block partition of level {}", self.level());
            self.clear_blockvectors();
        }
    }

    fn link_after(&mut self, v: VectorId, after: Option<VectorId>) -> Result<(), AlgebraError> {
        let succ = match after {
            Some(a) => self.vector(a)?.succ,
            None => self.first,
        };
        {
            let rec = self.vector_mut(v)?;
            rec.pred = after;
            rec.succ = succ;
        }
        match after {
            Some(a) => self.vector_mut(a)?.succ = Some(v),
            None => self.first = Some(v),
        }
        match succ {
            Some(s) => self.vector_mut(s)?.pred = Some(v),
            None => self.last = Some(v),
        }
        self.nvec += 1;
        Ok(())
    }

    fn unlink(&mut self, v: VectorId) -> Result<(), AlgebraError> {
        let (pred, succ) = {
            let rec = self.vector(v)?;
            (rec.pred, rec.succ)
        };
        match pred {
            Some(p) => self.vector_mut(p)?.succ = succ,
            None => self.first = succ,
        }
        match succ {
            Some(s) => self.vector_mut(s)?.pred = pred,
            None => self.last = pred,
        }
        let rec = self.vector_mut(v)?;
        rec.pred = None;
        rec.succ = None;
        self.nvec -= 1;
        Ok(())
    }

    /// Rebuilds the vector list in the order given by `order` and drops the
    /// block partition, if any.
    ///
    /// `order` must be a permutation of the level's vectors. On error the list
    /// and the partition are left untouched.
    pub(crate) fn relink(&mut self, order: &[VectorId]) -> Result<(), AlgebraError> {
        self.relink_keep_blocks(order)?;
        self.drop_stale_partition("relink");
        Ok(())
    }

    /// Like [`relink`](Self::relink), for partition builders whose tree
    /// already matches `order`.
    pub(crate) fn relink_keep_blocks(&mut self, order: &[VectorId]) -> Result<(), AlgebraError> {
        if order.len() != self.nvec {
            return Err(AlgebraError::inconsistency(format!(
                "ordering produced {} vectors, level holds {}",
                order.len(),
                self.nvec
            )));
        }
        let mut seen = HashSet::with_capacity(order.len());
        for &v in order {
            self.vector(v)?;
            if !seen.insert(v) {
                return Err(AlgebraError::inconsistency(format!(
                    "vector {v:?} appears twice in ordering"
                )));
            }
        }
        for (i, &v) in order.iter().enumerate() {
            let pred = i.checked_sub(1).map(|j| order[j]);
            let succ = order.get(i + 1).copied();
            let rec = self.vector_mut(v)?;
            rec.pred = pred;
            rec.succ = succ;
        }
        self.first = order.first().copied();
        self.last = order.last().copied();
        Ok(())
    }

    /// Assigns sequential indices `0..n` in list order.
    pub fn renumber(&mut self) -> Result<(), AlgebraError> {
        let ids = self.vector_ids();
        for (i, v) in ids.into_iter().enumerate() {
            self.vector_mut(v)?.index = i;
        }
        Ok(())
    }

    /// Reverses the vector list and renumbers.
    pub fn revert_order(&mut self) -> Result<(), AlgebraError> {
        let mut ids = self.vector_ids();
        ids.reverse();
        self.relink(&ids)?;
        self.renumber()
    }

    pub(crate) fn clear_used(&mut self) {
        let ids = self.vector_ids();
        for v in ids {
            if let Some(rec) = self.vectors.get_mut(v) {
                rec.used = false;
            }
        }
    }

    // ---------------------------------------------------------------------
    // matrices and connections
    // ---------------------------------------------------------------------

    #[inline]
    pub fn connection(&self, c: ConnectionId) -> Option<&Connection> {
        self.connections.get(c)
    }

    /// Live connections in slot order.
    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> + '_ {
        self.connections.iter()
    }

    #[inline]
    pub fn matrix(&self, m: MatrixId) -> Option<&Matrix> {
        self.connections
            .get(m.connection())
            .and_then(|con| con.matrices.get(m.half() as usize))
    }

    #[inline]
    pub fn matrix_mut(&mut self, m: MatrixId) -> Option<&mut Matrix> {
        self.connections
            .get_mut(m.connection())
            .and_then(|con| con.matrices.get_mut(m.half() as usize))
    }

    /// The reverse entry of `m` (itself for a diagonal entry).
    pub fn adjoint(&self, m: MatrixId) -> Option<MatrixId> {
        let con = self.connections.get(m.connection())?;
        Some(if con.is_diagonal() { m } else { m.flipped() })
    }

    /// Source vector of a matrix entry.
    pub fn matrix_source(&self, m: MatrixId) -> Option<VectorId> {
        self.adjoint(m)
            .and_then(|adj| self.matrix(adj))
            .map(Matrix::dest)
    }

    /// Off-diagonal entries of `v` in list order.
    pub fn off_diagonal(&self, v: VectorId) -> MatrixIter<'_> {
        MatrixIter {
            level: self,
            cursor: self.vectors.get(v).and_then(|rec| rec.first_offdiag),
        }
    }

    /// Full adjacency of `v`: the diagonal entry (if any) followed by the
    /// off-diagonal entries.
    pub fn adjacency(&self, v: VectorId) -> impl Iterator<Item = (MatrixId, &Matrix)> + '_ {
        let diag = self
            .vectors
            .get(v)
            .and_then(|rec| rec.diag)
            .and_then(|m| self.matrix(m).map(|mat| (m, mat)));
        diag.into_iter().chain(self.off_diagonal(v))
    }

    /// Entry `u → v`, if the two vectors are connected.
    pub fn get_matrix(&self, u: VectorId, v: VectorId) -> Option<MatrixId> {
        if u == v {
            return self.vectors.get(u).and_then(|rec| rec.diag);
        }
        self.off_diagonal(u)
            .find(|(_, mat)| mat.dest == v)
            .map(|(m, _)| m)
    }

    /// Connection between `u` and `v`, if any. Symmetric in its arguments.
    pub fn get_connection(&self, u: VectorId, v: VectorId) -> Option<ConnectionId> {
        self.get_matrix(u, v).map(MatrixId::connection)
    }

    /// Couples `u` and `v`; returns the existing connection if there is one.
    ///
    /// An existing connection loses its extra flag: it is now part of the
    /// base stencil. Fails with [`AlgebraError::ConfigurationError`] when the
    /// format defines no interaction for the type pair.
    pub fn create_connection(
        &mut self,
        u: VectorId,
        v: VectorId,
    ) -> Result<ConnectionId, AlgebraError> {
        self.create_connection_with(u, v, false)
    }

    /// Like [`create_connection`](Self::create_connection) but marks a newly
    /// allocated connection as solver-only fill-in.
    ///
    /// An existing connection is returned unchanged.
    pub fn create_extra_connection(
        &mut self,
        u: VectorId,
        v: VectorId,
    ) -> Result<ConnectionId, AlgebraError> {
        self.create_connection_with(u, v, true)
    }

    fn create_connection_with(
        &mut self,
        u: VectorId,
        v: VectorId,
        extra: bool,
    ) -> Result<ConnectionId, AlgebraError> {
        let tu = self.vector(u)?.vtype;
        let tv = self.vector(v)?.vtype;
        if let Some(c) = self.get_connection(u, v) {
            if !extra {
                if let Some(con) = self.connections.get_mut(c) {
                    con.extra = false;
                }
            }
            return Ok(c);
        }
        let payload = self.format.matrix_payload(tu, tv);
        if payload == 0 {
            return Err(AlgebraError::ConfigurationError { from: tu, to: tv });
        }
        let matrix_bytes = size_of::<Matrix>() + payload * size_of::<f64>();

        if u == v {
            let kind = ConnectionKind {
                diagonal: true,
                from: tu,
                to: tu,
            };
            let mut con = Connection::diagonal(Matrix::new(u, payload));
            con.extra = extra;
            let c = self
                .connections
                .acquire(&mut self.heap, kind, matrix_bytes, con)?;
            self.vector_mut(u)?.diag = Some(MatrixId::new(c, 0));
            return Ok(c);
        }

        let kind = ConnectionKind {
            diagonal: false,
            from: tu,
            to: tv,
        };
        let mut con = Connection::paired(Matrix::new(v, payload), Matrix::new(u, payload));
        con.extra = extra;
        let c = self
            .connections
            .acquire(&mut self.heap, kind, 2 * matrix_bytes, con)?;
        let forward = MatrixId::new(c, 0);
        let reverse = MatrixId::new(c, 1);
        self.push_off_diagonal(u, forward)?;
        self.push_off_diagonal(v, reverse)?;
        Ok(c)
    }

    /// Inserts `m` as the first off-diagonal entry of `v`.
    fn push_off_diagonal(&mut self, v: VectorId, m: MatrixId) -> Result<(), AlgebraError> {
        let head = self.vector(v)?.first_offdiag;
        self.matrix_mut(m)
            .ok_or_else(|| AlgebraError::inconsistency(format!("missing matrix {m:?}")))?
            .next = head;
        self.vector_mut(v)?.first_offdiag = Some(m);
        Ok(())
    }

    fn find_off_diagonal_pred(
        &self,
        source: VectorId,
        target: MatrixId,
    ) -> Result<Option<MatrixId>, AlgebraError> {
        let mut prev = None;
        let mut cursor = self.vector(source)?.first_offdiag;
        while let Some(m) = cursor {
            if m == target {
                return Ok(prev);
            }
            prev = Some(m);
            cursor = self
                .matrix(m)
                .ok_or_else(|| AlgebraError::inconsistency(format!("dangling matrix link {m:?}")))?
                .next;
        }
        Err(AlgebraError::inconsistency(format!(
            "matrix {target:?} missing from adjacency of {source:?}"
        )))
    }

    fn unlink_off_diagonal(
        &mut self,
        source: VectorId,
        pred: Option<MatrixId>,
        target: MatrixId,
    ) -> Result<(), AlgebraError> {
        let next = self.matrix(target).and_then(Matrix::next);
        match pred {
            None => self.vector_mut(source)?.first_offdiag = next,
            Some(p) => {
                if let Some(mat) = self.matrix_mut(p) {
                    mat.next = next;
                }
            }
        }
        Ok(())
    }

    /// Removes a connection (both halves) and returns it to the pool.
    pub fn dispose_connection(&mut self, c: ConnectionId) -> Result<(), AlgebraError> {
        let con = self
            .connections
            .get(c)
            .ok_or_else(|| AlgebraError::NotFound(format!("connection {c:?}")))?;
        if con.is_diagonal() {
            let owner = con.matrices[0].dest;
            let rec = self.vector_mut(owner)?;
            if rec.diag != Some(MatrixId::new(c, 0)) {
                return Err(AlgebraError::inconsistency(format!(
                    "diagonal connection {c:?} not attached to {owner:?}"
                )));
            }
            rec.diag = None;
        } else {
            let forward = MatrixId::new(c, 0);
            let reverse = MatrixId::new(c, 1);
            let u = con.matrices[1].dest;
            let v = con.matrices[0].dest;
            // locate both halves before touching either list
            let pred_u = self.find_off_diagonal_pred(u, forward)?;
            let pred_v = self.find_off_diagonal_pred(v, reverse)?;
            self.unlink_off_diagonal(u, pred_u, forward)?;
            self.unlink_off_diagonal(v, pred_v, reverse)?;
        }
        self.connections.release(c)?;
        Ok(())
    }

    /// Disposes every extra (fill-in) connection; returns how many.
    pub fn clear_extra_connections(&mut self) -> Result<usize, AlgebraError> {
        let extra: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, con)| con.extra)
            .map(|(c, _)| c)
            .collect();
        for &c in &extra {
            self.dispose_connection(c)?;
        }
        log::debug!(
            "clear_extra_connections: removed {} connections on level {}",
            extra.len(),
            self.level()
        );
        Ok(extra.len())
    }

    /// Clears the "new" flag of every matrix entry.
    pub fn clear_new_flags(&mut self) {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|(c, _)| c).collect();
        for c in ids {
            if let Some(con) = self.connections.get_mut(c) {
                for mat in con.matrices.iter_mut() {
                    mat.new = false;
                }
            }
        }
    }

    /// Relinks the off-diagonal list of `v` in the order of `order`, which
    /// must be a permutation of the current list.
    pub(crate) fn set_off_diagonal_order(
        &mut self,
        v: VectorId,
        order: &[MatrixId],
    ) -> Result<(), AlgebraError> {
        let current = self.off_diagonal(v).count();
        if current != order.len() {
            return Err(AlgebraError::inconsistency(format!(
                "adjacency of {v:?} has {current} entries, reorder supplied {}",
                order.len()
            )));
        }
        for (i, &m) in order.iter().enumerate() {
            let next = order.get(i + 1).copied();
            self.matrix_mut(m)
                .ok_or_else(|| AlgebraError::inconsistency(format!("missing matrix {m:?}")))?
                .next = next;
        }
        self.vector_mut(v)?.first_offdiag = order.first().copied();
        Ok(())
    }
}

/// Iterator over the vector list.
pub struct VectorIter<'a> {
    level: &'a AlgebraLevel,
    cursor: Option<VectorId>,
    forward: bool,
}

impl<'a> Iterator for VectorIter<'a> {
    type Item = (VectorId, &'a Vector);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let rec = self.level.vectors.get(id)?;
        self.cursor = if self.forward { rec.succ } else { rec.pred };
        Some((id, rec))
    }
}

/// Iterator over an off-diagonal adjacency list.
pub struct MatrixIter<'a> {
    level: &'a AlgebraLevel,
    cursor: Option<MatrixId>,
}

impl<'a> Iterator for MatrixIter<'a> {
    type Item = (MatrixId, &'a Matrix);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let mat = self.level.matrix(id)?;
        self.cursor = mat.next;
        Some((id, mat))
    }
}
