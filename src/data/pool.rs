//! Record pool: generation-checked slab storage with per-kind free lists.
//!
//! Every vector, connection and blockvector of a level lives in a
//! [`RecordPool`]. Released slots are pushed on the free list of their *kind*
//! and only ever recycled for a record of the same kind, so a slot keeps the
//! footprint it was charged for. Fresh slots are charged against the level's
//! [`Heap`] budget; exhausting it yields [`AlgebraError::OutOfMemory`].

use crate::algebra_error::AlgebraError;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use hashbrown::HashMap;

/// Strongly typed, generation-checked index of a record in a [`RecordPool`].
///
/// A handle stays valid until its record is released; afterwards lookups
/// through it fail even if the slot has been recycled.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _record: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[inline]
    const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _record: PhantomData,
        }
    }

    /// Slot index inside the owning pool.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Byte budget shared by all pools of one level.
///
/// Only fresh (bump) allocations are charged; recycling a free slot is free.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    used: usize,
    limit: Option<usize>,
}

impl Heap {
    /// A heap with an optional byte limit (`None` = unbounded).
    pub fn new(limit: Option<usize>) -> Self {
        Self { used: 0, limit }
    }

    /// Bytes charged so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Configured limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Replaces the limit. Bytes already charged stay charged.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    /// Bytes still available, `usize::MAX` when unbounded.
    pub fn available(&self) -> usize {
        self.limit
            .map_or(usize::MAX, |limit| limit.saturating_sub(self.used))
    }

    fn charge(&mut self, bytes: usize) -> Result<(), AlgebraError> {
        let available = self.available();
        if bytes > available {
            return Err(AlgebraError::OutOfMemory {
                requested: bytes,
                available,
            });
        }
        self.used += bytes;
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Slot<K, T> {
    generation: u32,
    kind: K,
    record: Option<T>,
}

/// Slab of records of type `T`, partitioned into kinds `K` for recycling.
#[derive(Clone, Debug)]
pub struct RecordPool<K, T>
where
    K: Copy + Eq + Hash,
{
    slots: Vec<Slot<K, T>>,
    free: HashMap<K, Vec<u32>>,
    live: usize,
}

impl<K, T> Default for RecordPool<K, T>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: HashMap::new(),
            live: 0,
        }
    }
}

impl<K, T> RecordPool<K, T>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` in a slot of `kind`.
    ///
    /// Pops the kind's free list if possible, otherwise charges `bytes` to
    /// `heap` and appends a fresh slot.
    pub fn acquire(
        &mut self,
        heap: &mut Heap,
        kind: K,
        bytes: usize,
        record: T,
    ) -> Result<Handle<T>, AlgebraError> {
        if let Some(index) = self.free.get_mut(&kind).and_then(Vec::pop) {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.record.is_none());
            slot.record = Some(record);
            self.live += 1;
            return Ok(Handle::new(index, slot.generation));
        }
        let index = u32::try_from(self.slots.len())
            .map_err(|_| AlgebraError::OutOfRange("record pool index space exhausted".into()))?;
        heap.charge(bytes)?;
        self.slots.push(Slot {
            generation: 0,
            kind,
            record: Some(record),
        });
        self.live += 1;
        Ok(Handle::new(index, 0))
    }

    /// Removes the record behind `handle` and recycles its slot.
    pub fn release(&mut self, handle: Handle<T>) -> Result<T, AlgebraError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or_else(|| AlgebraError::NotFound(format!("stale record handle {handle:?}")))?;
        let record = slot
            .record
            .take()
            .ok_or_else(|| AlgebraError::NotFound(format!("record {handle:?} already released")))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.entry(slot.kind).or_default().push(handle.index);
        self.live -= 1;
        Ok(record)
    }

    /// Shared access to a live record.
    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    /// Exclusive access to a live record.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    /// `true` if `handle` refers to a live record of this pool.
    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Kind of the slot behind a live handle.
    pub fn kind_of(&self, handle: Handle<T>) -> Option<K> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.record.is_some())
            .map(|slot| slot.kind)
    }

    /// Number of live records.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of recycled slots waiting on the free list of `kind`.
    pub fn free_count(&self, kind: K) -> usize {
        self.free.get(&kind).map_or(0, Vec::len)
    }

    /// Iterate over live `(handle, record)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.record
                .as_ref()
                .map(|record| (Handle::new(i as u32, slot.generation), record))
        })
    }
}
