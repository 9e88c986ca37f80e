//! Hierarchical partition index over the vector list.
//!
//! - [`description`]: bit-packed blockvector paths and their format
//! - [`tree`]: the blockvector tree and path lookup
//! - [`partition`]: stripe and domain-halfening partition builders

pub mod description;
pub mod partition;
pub mod tree;

pub use description::{BlockDescription, BlockFormat};
pub use partition::{create_domain_halfening_partition, create_stripe_partition};
pub use tree::{Blockvector, BlockvectorId, BlockvectorTree};
