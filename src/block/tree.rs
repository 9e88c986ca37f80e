//! Blockvector tree: nested sub-blocks over the vector list.
//!
//! Sibling blockvectors form a doubly linked list per tree level. A leaf
//! spans a contiguous run of the vector list; an inner blockvector spans the
//! concatenation of its children.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra_error::AlgebraError;
use crate::block::description::{BlockDescription, BlockFormat};
use crate::data::pool::{Handle, Heap, RecordPool};
use std::mem::size_of;

/// Handle of a [`Blockvector`] inside its level.
pub type BlockvectorId = Handle<Blockvector>;

/// A node of the partition tree.
#[derive(Clone, Debug)]
pub struct Blockvector {
    pub(crate) number: u64,
    pub(crate) leaf: bool,
    pub(crate) first_vector: Option<VectorId>,
    pub(crate) last_vector: Option<VectorId>,
    pub(crate) vector_count: usize,
    pub(crate) description: BlockDescription,
    pub(crate) parent: Option<BlockvectorId>,
    pub(crate) pred: Option<BlockvectorId>,
    pub(crate) succ: Option<BlockvectorId>,
    pub(crate) first_child: Option<BlockvectorId>,
    pub(crate) last_child: Option<BlockvectorId>,
}

impl Blockvector {
    /// Ordinal among its siblings.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// `true` if the blockvector bounds a run of vectors rather than children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[inline]
    pub fn first_vector(&self) -> Option<VectorId> {
        self.first_vector
    }

    #[inline]
    pub fn last_vector(&self) -> Option<VectorId> {
        self.last_vector
    }

    /// Number of spanned vectors.
    #[inline]
    pub fn vector_count(&self) -> usize {
        self.vector_count
    }

    /// Path from the top level to this blockvector.
    #[inline]
    pub fn description(&self) -> &BlockDescription {
        &self.description
    }

    #[inline]
    pub fn parent(&self) -> Option<BlockvectorId> {
        self.parent
    }

    #[inline]
    pub fn pred(&self) -> Option<BlockvectorId> {
        self.pred
    }

    #[inline]
    pub fn succ(&self) -> Option<BlockvectorId> {
        self.succ
    }

    #[inline]
    pub fn first_child(&self) -> Option<BlockvectorId> {
        self.first_child
    }
}

/// Partition tree of one level.
#[derive(Clone, Debug, Default)]
pub struct BlockvectorTree {
    pool: RecordPool<(), Blockvector>,
    pub(crate) format: Option<BlockFormat>,
    first: Option<BlockvectorId>,
    last: Option<BlockvectorId>,
}

impl BlockvectorTree {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Number of blockvectors at all tree levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Format the tree's paths were encoded with.
    #[inline]
    pub fn format(&self) -> Option<&BlockFormat> {
        self.format.as_ref()
    }

    /// First top-level blockvector.
    #[inline]
    pub fn first(&self) -> Option<BlockvectorId> {
        self.first
    }

    #[inline]
    pub fn get(&self, bv: BlockvectorId) -> Option<&Blockvector> {
        self.pool.get(bv)
    }

    fn node(&self, bv: BlockvectorId) -> Result<&Blockvector, AlgebraError> {
        self.pool
            .get(bv)
            .ok_or_else(|| AlgebraError::NotFound(format!("blockvector {bv:?}")))
    }

    fn node_mut(&mut self, bv: BlockvectorId) -> Result<&mut Blockvector, AlgebraError> {
        self.pool
            .get_mut(bv)
            .ok_or_else(|| AlgebraError::NotFound(format!("blockvector {bv:?}")))
    }

    /// Appends a blockvector as the last child of `parent` (or as the last
    /// top-level blockvector).
    pub(crate) fn create(
        &mut self,
        heap: &mut Heap,
        parent: Option<BlockvectorId>,
        number: u64,
        leaf: bool,
        description: BlockDescription,
    ) -> Result<BlockvectorId, AlgebraError> {
        let pred = match parent {
            Some(p) => self.node(p)?.last_child,
            None => self.last,
        };
        let record = Blockvector {
            number,
            leaf,
            first_vector: None,
            last_vector: None,
            vector_count: 0,
            description,
            parent,
            pred,
            succ: None,
            first_child: None,
            last_child: None,
        };
        let bv = self
            .pool
            .acquire(heap, (), size_of::<Blockvector>(), record)?;
        match pred {
            Some(p) => self.node_mut(p)?.succ = Some(bv),
            None => match parent {
                Some(p) => self.node_mut(p)?.first_child = Some(bv),
                None => self.first = Some(bv),
            },
        }
        match parent {
            Some(p) => self.node_mut(p)?.last_child = Some(bv),
            None => self.last = Some(bv),
        }
        Ok(bv)
    }

    pub(crate) fn set_span(
        &mut self,
        bv: BlockvectorId,
        span: &[VectorId],
    ) -> Result<(), AlgebraError> {
        let node = self.node_mut(bv)?;
        node.first_vector = span.first().copied();
        node.last_vector = span.last().copied();
        node.vector_count = span.len();
        Ok(())
    }

    /// Siblings starting at `start`.
    pub fn siblings(&self, start: Option<BlockvectorId>) -> SiblingIter<'_> {
        SiblingIter {
            tree: self,
            cursor: start,
        }
    }

    /// Children of `parent`, or the top level for `None`.
    pub fn children(&self, parent: Option<BlockvectorId>) -> SiblingIter<'_> {
        let start = match parent {
            Some(p) => self.pool.get(p).and_then(|node| node.first_child),
            None => self.first,
        };
        self.siblings(start)
    }

    /// Leaves in depth-first (= vector list) order.
    pub fn leaves(&self) -> Vec<BlockvectorId> {
        let mut out = Vec::new();
        let mut stack: Vec<BlockvectorId> = self.children(None).map(|(id, _)| id).collect();
        stack.reverse();
        while let Some(bv) = stack.pop() {
            let Some(node) = self.pool.get(bv) else {
                continue;
            };
            if node.leaf {
                out.push(bv);
            } else {
                let mut kids: Vec<_> = self.children(Some(bv)).map(|(id, _)| id).collect();
                kids.reverse();
                stack.extend(kids);
            }
        }
        out
    }

    /// Locates the blockvector named by `desc`, descending from the top level.
    pub fn find(&self, desc: &BlockDescription) -> Result<BlockvectorId, AlgebraError> {
        self.find_from(self.first, desc)
    }

    /// Locates the blockvector named by `desc`, starting the descent at the
    /// sibling list beginning with `root`.
    pub fn find_from(
        &self,
        root: Option<BlockvectorId>,
        desc: &BlockDescription,
    ) -> Result<BlockvectorId, AlgebraError> {
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| AlgebraError::NotFound("level has no block partition".into()))?;
        if desc.is_empty() {
            return Err(AlgebraError::NotFound("empty block path".into()));
        }
        let mut cursor = root;
        for level in 0..desc.current() {
            let number = desc.entry(level, format).ok_or_else(|| {
                AlgebraError::inconsistency(format!("block path lost entry {level}"))
            })?;
            let (found, node) = self
                .siblings(cursor)
                .find(|(_, node)| node.number == number)
                .ok_or_else(|| {
                    AlgebraError::NotFound(format!("no block {number} on tree level {level}"))
                })?;
            if level + 1 == desc.current() {
                return Ok(found);
            }
            if node.leaf {
                return Err(AlgebraError::inconsistency(format!(
                    "block path continues below leaf {found:?} at tree level {level}"
                )));
            }
            cursor = node.first_child;
        }
        Err(AlgebraError::NotFound("block path exhausted".into()))
    }

    /// Releases every blockvector.
    pub(crate) fn clear(&mut self) {
        let ids: Vec<_> = self.pool.iter().map(|(id, _)| id).collect();
        for id in ids {
            // ids come straight from the pool, release cannot miss
            let _ = self.pool.release(id);
        }
        self.first = None;
        self.last = None;
        self.format = None;
    }
}

/// Iterator along a sibling list.
pub struct SiblingIter<'a> {
    tree: &'a BlockvectorTree,
    cursor: Option<BlockvectorId>,
}

impl<'a> Iterator for SiblingIter<'a> {
    type Item = (BlockvectorId, &'a Blockvector);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.tree.pool.get(id)?;
        self.cursor = node.succ;
        Some((id, node))
    }
}

impl AlgebraLevel {
    /// The level's partition tree.
    #[inline]
    pub fn blockvectors(&self) -> &BlockvectorTree {
        &self.blocks
    }

    /// Drops the partition tree and every vector's block path.
    pub fn clear_blockvectors(&mut self) {
        self.blocks.clear();
        let ids = self.vector_ids();
        for v in ids {
            if let Ok(rec) = self.vector_mut(v) {
                rec.block.clear();
            }
        }
    }

    /// Vectors spanned by `bv`, in list order.
    pub fn block_vectors(&self, bv: BlockvectorId) -> Result<Vec<VectorId>, AlgebraError> {
        let node = self.blocks.node(bv)?;
        let mut out = Vec::with_capacity(node.vector_count);
        let (Some(first), Some(last)) = (node.first_vector, node.last_vector) else {
            return Ok(out);
        };
        let mut cursor = Some(first);
        while let Some(v) = cursor {
            out.push(v);
            if v == last {
                return Ok(out);
            }
            cursor = self.vector(v)?.succ();
        }
        Err(AlgebraError::inconsistency(format!(
            "blockvector {bv:?} range is not contiguous in the vector list"
        )))
    }
}
