//! `PointId`: a strong, zero-cost handle for topology entities
//!
//! The algebra layer never owns grid topology; it only refers to the entity a
//! vector is attached to (a node, edge, side or element of the external grid)
//! through this opaque identifier. `PointId` wraps a nonzero `u64` so that 0
//! stays available as an invalid or sentinel value on the collaborator side.

use crate::algebra_error::AlgebraError;
use std::{fmt, num::NonZeroU64};

/// Identifier of a topology entity owned by an external grid.
///
/// This type is `repr(transparent)` over `NonZeroU64`, so `Option<PointId>`
/// is still a single word.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct PointId(NonZeroU64);

impl PointId {
    /// Creates a new `PointId` from a raw `u64` value.
    ///
    /// Returns [`AlgebraError::InvalidPointId`] for `raw == 0`.
    ///
    /// ```rust
    /// # use mesh_algebra::topology::point::PointId;
    /// let p = PointId::new(1).unwrap();
    /// assert_eq!(p.get(), 1);
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, AlgebraError> {
        NonZeroU64::new(raw)
            .map(PointId)
            .ok_or(AlgebraError::InvalidPointId)
    }

    /// Returns the inner `u64` value of this `PointId`.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PointId").field(&self.get()).finish()
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::assert_eq_size;

    assert_eq_size!(PointId, u64);
    assert_eq_size!(Option<PointId>, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(PointId::new(0), Err(AlgebraError::InvalidPointId));
    }

    #[test]
    fn debug_and_display() {
        let p = PointId::new(7).unwrap();
        assert_eq!(format!("{:?}", p), "PointId(7)");
        assert_eq!(format!("{}", p), "7");
    }

    #[test]
    fn json_roundtrip() {
        let p = PointId::new(123).unwrap();
        let s = serde_json::to_string(&p).unwrap();
        let p2: PointId = serde_json::from_str(&s).unwrap();
        assert_eq!(p2, p);
    }
}
