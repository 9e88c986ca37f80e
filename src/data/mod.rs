//! Storage and format primitives shared by all levels.

pub mod format;
pub mod pool;

pub use format::{AlgebraFormat, LevelConfig};
pub use pool::{Handle, Heap, RecordPool};
