//! Bit-packed blockvector paths.
//!
//! A [`BlockFormat`] fixes how many bits one tree level occupies; a
//! [`BlockDescription`] is a stack of block ordinals (root first) packed into
//! a single `u64`, so copying and comparing paths is O(1).

use crate::algebra_error::AlgebraError;
use serde::{Deserialize, Serialize};

/// Total number of bits available for a path.
pub const BLOCK_PATH_BITS: u32 = u64::BITS;

/// Bits-per-level layout with precomputed cumulative masks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockFormat {
    bits: u32,
    max_level: u32,
    level_masks: [u64; BLOCK_PATH_BITS as usize],
}

impl BlockFormat {
    /// Format able to number `max_blocks_per_level` siblings per level.
    ///
    /// Uses `ceil(log2(max_blocks_per_level))` bits per level. Fails for fewer
    /// than two blocks per level or when not a single level fits.
    pub fn new(max_blocks_per_level: u64) -> Result<Self, AlgebraError> {
        if max_blocks_per_level < 2 {
            return Err(AlgebraError::OutOfRange(format!(
                "block format needs at least 2 blocks per level, got {max_blocks_per_level}"
            )));
        }
        let bits = u64::BITS - (max_blocks_per_level - 1).leading_zeros();
        let max_level = BLOCK_PATH_BITS / bits;
        if max_level == 0 {
            return Err(AlgebraError::OutOfRange(format!(
                "{bits} bits per level leave no room for a block path"
            )));
        }
        let mut level_masks = [0u64; BLOCK_PATH_BITS as usize];
        for (level, mask) in level_masks.iter_mut().enumerate().take(max_level as usize) {
            let width = bits * (level as u32 + 1);
            *mask = if width >= u64::BITS {
                u64::MAX
            } else {
                (1u64 << width) - 1
            };
        }
        Ok(Self {
            bits,
            max_level,
            level_masks,
        })
    }

    /// Bits used per tree level.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Maximal path length.
    #[inline]
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Largest ordinal representable on one level.
    #[inline]
    pub fn max_number(&self) -> u64 {
        u64::MAX >> (u64::BITS - self.bits)
    }

    /// Mask covering the entries of levels `0..levels`.
    #[inline]
    pub fn prefix_mask(&self, levels: u32) -> u64 {
        match levels {
            0 => 0,
            n => self.level_masks[(n.min(self.max_level) - 1) as usize],
        }
    }
}

/// Packed root-to-node path of block ordinals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PackedPath")]
pub struct BlockDescription {
    entries: u64,
    current: u32,
}

/// Wire form of [`BlockDescription`], checked before use.
#[derive(Deserialize)]
struct PackedPath {
    entries: u64,
    current: u32,
}

impl TryFrom<PackedPath> for BlockDescription {
    type Error = AlgebraError;

    fn try_from(raw: PackedPath) -> Result<Self, Self::Error> {
        if raw.current > u64::BITS {
            return Err(AlgebraError::OutOfRange(format!(
                "block path of {} levels exceeds {} bits",
                raw.current,
                u64::BITS
            )));
        }
        Ok(Self {
            entries: raw.entries,
            current: raw.current,
        })
    }
}

impl BlockDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries on the path.
    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Raw packed bits.
    #[inline]
    pub fn packed(&self) -> u64 {
        self.entries
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Appends one level to the path.
    pub fn push_entry(&mut self, number: u64, format: &BlockFormat) -> Result<(), AlgebraError> {
        if self.current >= format.max_level() {
            return Err(AlgebraError::OutOfRange(format!(
                "block path already holds {} levels (max {})",
                self.current,
                format.max_level()
            )));
        }
        if number > format.max_number() {
            return Err(AlgebraError::OutOfRange(format!(
                "block number {number} does not fit in {} bits",
                format.bits()
            )));
        }
        self.entries |= number << (self.current * format.bits());
        self.current += 1;
        Ok(())
    }

    /// Removes and returns the deepest entry.
    pub fn pop_entry(&mut self, format: &BlockFormat) -> Option<u64> {
        if self.current == 0 {
            return None;
        }
        let number = self.entry(self.current - 1, format)?;
        self.current -= 1;
        self.entries &= format.prefix_mask(self.current);
        Some(number)
    }

    /// Entry at tree level `level` (0 = top).
    ///
    /// `None` past the end of the path or past the depth `format` can encode.
    pub fn entry(&self, level: u32, format: &BlockFormat) -> Option<u64> {
        if level >= self.current || level >= format.max_level() {
            return None;
        }
        let shift = level.checked_mul(format.bits())?;
        self.entries
            .checked_shr(shift)
            .map(|bits| bits & format.max_number())
    }

    /// Entries from the top level down.
    pub fn entries<'a>(&'a self, format: &'a BlockFormat) -> impl Iterator<Item = u64> + 'a {
        (0..self.current).filter_map(move |level| self.entry(level, format))
    }

    /// `true` if `self` names `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &BlockDescription, format: &BlockFormat) -> bool {
        self.current <= other.current
            && (self.entries ^ other.entries) & format.prefix_mask(self.current) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_follow_log2() {
        assert_eq!(BlockFormat::new(2).unwrap().bits(), 1);
        assert_eq!(BlockFormat::new(3).unwrap().bits(), 2);
        assert_eq!(BlockFormat::new(4).unwrap().bits(), 2);
        assert_eq!(BlockFormat::new(5).unwrap().bits(), 3);
        assert_eq!(BlockFormat::new(3).unwrap().max_level(), 32);
        assert!(BlockFormat::new(1).is_err());
        assert_eq!(BlockFormat::new(u64::MAX).unwrap().max_level(), 1);
    }

    #[test]
    fn push_until_full() {
        let fmt = BlockFormat::new(1 << 16).unwrap();
        assert_eq!(fmt.max_level(), 4);
        let mut d = BlockDescription::new();
        for n in [7, 0, 65535, 3] {
            d.push_entry(n, &fmt).unwrap();
        }
        assert!(matches!(
            d.push_entry(1, &fmt),
            Err(AlgebraError::OutOfRange(_))
        ));
        assert_eq!(d.entries(&fmt).collect::<Vec<_>>(), vec![7, 0, 65535, 3]);
        assert_eq!(d.pop_entry(&fmt), Some(3));
        assert_eq!(d.current(), 3);
        d.push_entry(9, &fmt).unwrap();
        assert_eq!(d.entry(3, &fmt), Some(9));
    }

    #[test]
    fn prefix_relation() {
        let fmt = BlockFormat::new(3).unwrap();
        let mut parent = BlockDescription::new();
        parent.push_entry(1, &fmt).unwrap();
        let mut child = parent;
        child.push_entry(2, &fmt).unwrap();
        let mut other = BlockDescription::new();
        other.push_entry(0, &fmt).unwrap();
        assert!(parent.is_prefix_of(&child, &fmt));
        assert!(!child.is_prefix_of(&parent, &fmt));
        assert!(!other.is_prefix_of(&child, &fmt));
        assert!(BlockDescription::new().is_prefix_of(&other, &fmt));
    }

    #[test]
    fn oversized_number_rejected() {
        let fmt = BlockFormat::new(3).unwrap();
        let mut d = BlockDescription::new();
        assert!(d.push_entry(4, &fmt).is_err());
        assert!(d.is_empty());
    }

    #[test]
    fn deserialized_path_is_checked() {
        let fmt = BlockFormat::new(3).unwrap();
        let mut d = BlockDescription::new();
        d.push_entry(2, &fmt).unwrap();
        d.push_entry(1, &fmt).unwrap();
        let s = serde_json::to_string(&d).unwrap();
        assert_eq!(serde_json::from_str::<BlockDescription>(&s).unwrap(), d);

        assert!(serde_json::from_str::<BlockDescription>(r#"{"entries":0,"current":65}"#).is_err());
        // deeper than the format can encode: entries stop at its depth
        let deep: BlockDescription =
            serde_json::from_str(r#"{"entries":0,"current":40}"#).unwrap();
        assert_eq!(deep.entries(&fmt).count(), 32);
        assert_eq!(deep.entry(32, &fmt), None);
    }

    #[test]
    fn foreign_format_never_overflows() {
        let narrow = BlockFormat::new(2).unwrap();
        let wide = BlockFormat::new(u64::MAX).unwrap();
        let mut d = BlockDescription::new();
        for _ in 0..narrow.max_level() {
            d.push_entry(1, &narrow).unwrap();
        }
        assert_eq!(d.current(), 64);
        assert_eq!(d.entry(0, &wide), Some(u64::MAX));
        assert_eq!(d.entry(1, &wide), None);
        assert_eq!(d.entry(63, &wide), None);
    }
}
