//! Matrix entries and the connections that own them.
//!
//! A [`Connection`] couples two distinct vectors and holds both directed
//! halves in one record: half 0 lives in the adjacency list of the first
//! vector, half 1 in the list of the second. Either half reaches its adjoint
//! by flipping the half bit. A diagonal connection holds a single matrix.

use crate::algebra::vector::{VectorId, VectorType};
use crate::data::pool::Handle;

/// Handle of a [`Connection`] inside its level.
pub type ConnectionId = Handle<Connection>;

/// Locates one directed matrix entry: a connection plus the half within it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatrixId {
    connection: ConnectionId,
    half: u8,
}

impl MatrixId {
    #[inline]
    pub(crate) const fn new(connection: ConnectionId, half: u8) -> Self {
        Self { connection, half }
    }

    #[inline]
    pub const fn connection(self) -> ConnectionId {
        self.connection
    }

    /// 0 for the forward half (or a diagonal entry), 1 for the reverse half.
    #[inline]
    pub const fn half(self) -> u8 {
        self.half
    }

    /// The other half of a paired connection.
    ///
    /// Meaningless for diagonal entries; use
    /// [`AlgebraLevel::adjoint`](crate::algebra::level::AlgebraLevel::adjoint)
    /// when the kind is not known.
    #[inline]
    pub const fn flipped(self) -> Self {
        Self {
            connection: self.connection,
            half: self.half ^ 1,
        }
    }
}

/// A directed coupling entry.
#[derive(Clone, Debug)]
pub struct Matrix {
    pub(crate) dest: VectorId,
    pub(crate) next: Option<MatrixId>,
    pub(crate) new: bool,
    pub(crate) up: bool,
    pub(crate) down: bool,
    pub(crate) values: Box<[f64]>,
}

impl Matrix {
    pub(crate) fn new(dest: VectorId, payload: usize) -> Self {
        Self {
            dest,
            next: None,
            new: true,
            up: false,
            down: false,
            values: vec![0.0; payload].into_boxed_slice(),
        }
    }

    /// Destination vector.
    #[inline]
    pub fn dest(&self) -> VectorId {
        self.dest
    }

    /// Next entry in the source vector's off-diagonal list.
    #[inline]
    pub fn next(&self) -> Option<MatrixId> {
        self.next
    }

    /// Created during the current algebraic modification pass.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// The destination must be ordered after the source.
    #[inline]
    pub fn is_up(&self) -> bool {
        self.up
    }

    /// The destination must be ordered before the source.
    #[inline]
    pub fn is_down(&self) -> bool {
        self.down
    }

    #[inline]
    pub fn set_up(&mut self, up: bool) {
        self.up = up;
    }

    #[inline]
    pub fn set_down(&mut self, down: bool) {
        self.down = down;
    }

    #[inline]
    pub fn clear_new(&mut self) {
        self.new = false;
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

/// Free-list kind of a connection record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionKind {
    pub diagonal: bool,
    pub from: VectorType,
    pub to: VectorType,
}

/// Allocation unit backing one diagonal entry or one pair of off-diagonal
/// entries.
#[derive(Clone, Debug)]
pub struct Connection {
    pub(crate) matrices: Box<[Matrix]>,
    pub(crate) extra: bool,
}

impl Connection {
    pub(crate) fn diagonal(matrix: Matrix) -> Self {
        Self {
            matrices: vec![matrix].into_boxed_slice(),
            extra: false,
        }
    }

    pub(crate) fn paired(forward: Matrix, reverse: Matrix) -> Self {
        Self {
            matrices: vec![forward, reverse].into_boxed_slice(),
            extra: false,
        }
    }

    #[inline]
    pub fn is_diagonal(&self) -> bool {
        self.matrices.len() == 1
    }

    /// Solver-only coupling (e.g. fill-in), outside the base stencil.
    #[inline]
    pub fn is_extra(&self) -> bool {
        self.extra
    }

    /// Matrix halves, forward first.
    #[inline]
    pub fn matrices(&self) -> &[Matrix] {
        &self.matrices
    }
}
