//! Interface to the external grid topology.
//!
//! This module provides:
//! - [`point::PointId`], the handle of topology entities vectors live on
//! - [`access`]: the [`ElementTopology`] and [`VectorGeometry`] traits the
//!   algebra layer consumes
//! - [`structured`]: a structured quadrilateral grid implementing both

pub mod access;
pub mod point;
pub mod structured;

pub use access::{ElementTopology, Position, VectorGeometry};
pub use point::PointId;
pub use structured::StructuredQuadGrid;
