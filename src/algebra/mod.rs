//! Connectivity graph of a grid level.
//!
//! This module provides:
//! - [`vector`] and [`matrix`]: the vector, matrix and connection records
//! - [`level`]: [`AlgebraLevel`], owning the pools, the vector list and all
//!   create/dispose/lookup operations
//! - [`stencil`]: depth-limited connection construction across elements
//! - [`classes`]: vector class seeding and propagation
//! - [`validation`]: structural checks of a level

pub mod classes;
pub mod level;
pub mod matrix;
pub mod stencil;
pub mod validation;
pub mod vector;

pub use level::AlgebraLevel;
pub use matrix::{Connection, ConnectionId, Matrix, MatrixId};
pub use vector::{Vector, VectorId, VectorType};
