//! Streamwise (downwind) ordering.
//!
//! A [`DependencyProcedure`] labels every matrix entry `up` or `down`.
//! `down` on `A → B` means `B` is upstream of `A` and must come first; `up`
//! on `A → B` means `A` must come first. The engine then peels the
//! dependency graph from both ends: vectors without pending predecessors
//! join FIRST in placement order, vectors without pending successors join
//! LAST in reverse placement order. When neither end can grow the remaining
//! vectors contain a cycle and a [`CutSetProcedure`] picks vectors to place
//! into CUT, which releases their neighbours.
//!
//! ```text
//! FirstCutLast:       [ FIRST ........ ][ CUT ][ LAST ]
//! FirstCutRemainder:  [ FIRST ][ CUT ][ FIRST' ][ LAST ]
//! ```
//!
//! where `FIRST'` holds the vectors that joined FIRST after the first cut.
//! Several cut rounds are not interleaved: CUT collects the vectors of every
//! round, so all of them precede all of `FIRST'`. Cut vectors carry no
//! ordering guarantee, so every uncut `down`/`up` dependency still holds.

use crate::algebra::level::{AlgebraLevel, VectorId};
use crate::algebra_error::AlgebraError;
use crate::algs::circular::{Rotation, order_adjacency_circular};
use crate::algs::lex::ORDERRES;
use crate::algs::vector_position;
use crate::topology::access::{Position, VectorGeometry};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Labels the `up`/`down` flags of a level's matrix entries.
///
/// The engine clears every flag before calling [`label`](Self::label).
pub trait DependencyProcedure {
    fn label(&mut self, level: &mut AlgebraLevel) -> Result<(), AlgebraError>;
}

impl<F> DependencyProcedure for F
where
    F: FnMut(&mut AlgebraLevel) -> Result<(), AlgebraError>,
{
    fn label(&mut self, level: &mut AlgebraLevel) -> Result<(), AlgebraError> {
        self(level)
    }
}

/// Vectors with a lower index are upstream.
#[derive(Copy, Clone, Debug, Default)]
pub struct IndexDependency;

impl DependencyProcedure for IndexDependency {
    fn label(&mut self, level: &mut AlgebraLevel) -> Result<(), AlgebraError> {
        for v in level.vector_ids() {
            let own = level.vector(v)?.index();
            let entries: Vec<_> = level
                .off_diagonal(v)
                .map(|(m, mat)| (m, mat.dest()))
                .collect();
            for (m, dest) in entries {
                let other = level.vector(dest)?.index();
                if let Some(mat) = level.matrix_mut(m) {
                    mat.set_down(other < own);
                    mat.set_up(other > own);
                }
            }
        }
        Ok(())
    }
}

/// Vectors lying upstream along a constant flow direction come first.
///
/// Neighbours whose offset along the flow is within the tolerance are
/// treated as independent.
#[derive(Clone, Debug)]
pub struct FlowDependency<'g, G: ?Sized> {
    geometry: &'g G,
    direction: Position,
    tolerance: f64,
}

impl<'g, G: VectorGeometry + ?Sized> FlowDependency<'g, G> {
    pub fn new(geometry: &'g G, direction: Position) -> Self {
        Self {
            geometry,
            direction,
            tolerance: ORDERRES,
        }
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl<G: VectorGeometry + ?Sized> DependencyProcedure for FlowDependency<'_, G> {
    fn label(&mut self, level: &mut AlgebraLevel) -> Result<(), AlgebraError> {
        for v in level.vector_ids() {
            let from = vector_position(level, self.geometry, v)?;
            let entries: Vec<_> = level
                .off_diagonal(v)
                .map(|(m, mat)| (m, mat.dest()))
                .collect();
            for (m, dest) in entries {
                let to = vector_position(level, self.geometry, dest)?;
                let along: f64 = (0..3).map(|k| (to[k] - from[k]) * self.direction[k]).sum();
                if let Some(mat) = level.matrix_mut(m) {
                    mat.set_down(along < -self.tolerance);
                    mat.set_up(along > self.tolerance);
                }
            }
        }
        Ok(())
    }
}

/// Snapshot handed to a [`CutSetProcedure`] when the peeling stalls.
pub struct CutContext<'a> {
    pub level: &'a AlgebraLevel,
    /// Unplaced vectors in current list order.
    pub remaining: &'a [VectorId],
    /// Unplaced predecessors of each entry of `remaining`.
    pub pending_before: &'a [usize],
    /// Unplaced successors of each entry of `remaining`.
    pub pending_after: &'a [usize],
}

/// Chooses vectors to break dependency cycles.
///
/// Returning no vector of `remaining` is an error: the engine would not
/// make progress.
pub trait CutSetProcedure {
    fn select(&mut self, ctx: &CutContext<'_>) -> Result<Vec<VectorId>, AlgebraError>;
}

/// Puts every remaining vector into CUT at once.
#[derive(Copy, Clone, Debug, Default)]
pub struct PushAllFirst;

impl CutSetProcedure for PushAllFirst {
    fn select(&mut self, ctx: &CutContext<'_>) -> Result<Vec<VectorId>, AlgebraError> {
        Ok(ctx.remaining.to_vec())
    }
}

/// Cuts one vector per round, the one blocking the most dependency pairs.
#[derive(Copy, Clone, Debug, Default)]
pub struct GreedyFeedback;

impl CutSetProcedure for GreedyFeedback {
    fn select(&mut self, ctx: &CutContext<'_>) -> Result<Vec<VectorId>, AlgebraError> {
        let mut best: Option<(usize, VectorId)> = None;
        for (i, &v) in ctx.remaining.iter().enumerate() {
            let score = ctx.pending_before[i] * ctx.pending_after[i];
            if best.is_none_or(|(s, _)| score > s) {
                best = Some((score, v));
            }
        }
        Ok(best.map(|(_, v)| v).into_iter().collect())
    }
}

/// Arrangement of the FIRST, CUT and LAST regions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamwiseLayout {
    #[default]
    FirstCutLast,
    FirstCutRemainder,
}

/// Serializable options of the streamwise engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamwiseOpts {
    pub layout: StreamwiseLayout,
    /// Place skip-flagged vectors into FIRST regardless of dependencies.
    pub skip_first: bool,
    /// Sort adjacency lists rotationally after reordering (2D only).
    pub circular: Option<Rotation>,
}

/// Outcome of a streamwise run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamwiseReport {
    pub first: usize,
    /// Of `first`, the vectors that joined after the first cut.
    pub first_after_cut: usize,
    pub last: usize,
    /// Vectors placed by the cut-set procedure, in placement order.
    pub cut_vectors: Vec<VectorId>,
    pub cut_rounds: usize,
}

impl StreamwiseReport {
    #[inline]
    pub fn cut(&self) -> usize {
        self.cut_vectors.len()
    }

    /// Vectors placed in total.
    #[inline]
    pub fn visited(&self) -> usize {
        self.first + self.cut() + self.last
    }
}

/// Dependency graph state while peeling.
struct Peeler {
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
    pending_before: Vec<usize>,
    pending_after: Vec<usize>,
    placed: Vec<bool>,
    first_queue: VecDeque<usize>,
    last_queue: VecDeque<usize>,
    placed_count: usize,
}

impl Peeler {
    fn build(level: &AlgebraLevel, ids: &[VectorId]) -> Result<Self, AlgebraError> {
        let n = ids.len();
        let slot: HashMap<VectorId, usize> = ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        let mut preds = vec![Vec::new(); n];
        let mut succs = vec![Vec::new(); n];
        for (i, &v) in ids.iter().enumerate() {
            for (_, mat) in level.off_diagonal(v) {
                let j = *slot.get(&mat.dest()).ok_or_else(|| {
                    AlgebraError::inconsistency(format!("{v:?} couples to a foreign vector"))
                })?;
                if mat.is_down() {
                    preds[i].push(j);
                    succs[j].push(i);
                }
                if mat.is_up() {
                    succs[i].push(j);
                    preds[j].push(i);
                }
            }
        }
        for list in preds.iter_mut().chain(succs.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }
        let pending_before = preds.iter().map(Vec::len).collect();
        let pending_after = succs.iter().map(Vec::len).collect();
        Ok(Self {
            preds,
            succs,
            pending_before,
            pending_after,
            placed: vec![false; n],
            first_queue: VecDeque::new(),
            last_queue: VecDeque::new(),
            placed_count: 0,
        })
    }

    fn is_done(&self) -> bool {
        self.placed_count == self.placed.len()
    }

    /// Marks `i` placed and releases its neighbours.
    fn settle(&mut self, i: usize) {
        self.placed[i] = true;
        self.placed_count += 1;
        for k in 0..self.succs[i].len() {
            let s = self.succs[i][k];
            self.pending_before[s] -= 1;
            if self.pending_before[s] == 0 && !self.placed[s] {
                self.first_queue.push_back(s);
            }
        }
        for k in 0..self.preds[i].len() {
            let p = self.preds[i][k];
            self.pending_after[p] -= 1;
            if self.pending_after[p] == 0 && !self.placed[p] {
                self.last_queue.push_back(p);
            }
        }
    }

    fn pop_first(&mut self) -> Option<usize> {
        while let Some(i) = self.first_queue.pop_front() {
            if !self.placed[i] {
                return Some(i);
            }
        }
        None
    }

    fn pop_last(&mut self) -> Option<usize> {
        while let Some(i) = self.last_queue.pop_front() {
            if !self.placed[i] {
                return Some(i);
            }
        }
        None
    }
}

/// Builder for a streamwise reordering run.
///
/// ```ignore
/// let report = StreamwiseOrder::new(IndexDependency)
///     .cut_set(GreedyFeedback)
///     .layout(StreamwiseLayout::FirstCutRemainder)
///     .run(&mut level)?;
/// ```
pub struct StreamwiseOrder<'a> {
    dependency: Box<dyn DependencyProcedure + 'a>,
    cut_set: Box<dyn CutSetProcedure + 'a>,
    opts: StreamwiseOpts,
    geometry: Option<&'a dyn VectorGeometry>,
}

impl<'a> StreamwiseOrder<'a> {
    pub fn new<D: DependencyProcedure + 'a>(dependency: D) -> Self {
        Self {
            dependency: Box::new(dependency),
            cut_set: Box::new(PushAllFirst),
            opts: StreamwiseOpts::default(),
            geometry: None,
        }
    }

    pub fn cut_set<C: CutSetProcedure + 'a>(mut self, cut_set: C) -> Self {
        self.cut_set = Box::new(cut_set);
        self
    }

    pub fn layout(mut self, layout: StreamwiseLayout) -> Self {
        self.opts.layout = layout;
        self
    }

    pub fn skip_first(mut self, yes: bool) -> Self {
        self.opts.skip_first = yes;
        self
    }

    /// Sorts every adjacency list rotationally after reordering.
    pub fn circular(mut self, geometry: &'a dyn VectorGeometry, rotation: Rotation) -> Self {
        self.geometry = Some(geometry);
        self.opts.circular = Some(rotation);
        self
    }

    /// Replaces all options at once; a rotation needs [`Self::geometry`].
    pub fn opts(mut self, opts: StreamwiseOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn geometry(mut self, geometry: &'a dyn VectorGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Labels dependencies, reorders the list and renumbers from 0.
    pub fn run(mut self, level: &mut AlgebraLevel) -> Result<StreamwiseReport, AlgebraError> {
        clear_dependency_flags(level);
        self.dependency.label(level)?;

        let ids = level.vector_ids();
        let mut peel = Peeler::build(level, &ids)?;
        for (i, &v) in ids.iter().enumerate() {
            let forced = self.opts.skip_first && level.vector(v)?.is_skip();
            if forced || peel.pending_before[i] == 0 {
                peel.first_queue.push_back(i);
            } else if peel.pending_after[i] == 0 {
                peel.last_queue.push_back(i);
            }
        }

        let mut first = Vec::new();
        let mut first_after_cut = Vec::new();
        let mut last = Vec::new();
        let mut cut = Vec::new();
        let mut cut_rounds = 0;
        loop {
            loop {
                let mut progressed = false;
                while let Some(i) = peel.pop_first() {
                    if cut_rounds == 0 {
                        first.push(i);
                    } else {
                        first_after_cut.push(i);
                    }
                    peel.settle(i);
                    progressed = true;
                }
                while let Some(i) = peel.pop_last() {
                    last.push(i);
                    peel.settle(i);
                    progressed = true;
                }
                if !progressed {
                    break;
                }
            }
            if peel.is_done() {
                break;
            }

            let remaining_idx: Vec<usize> = (0..ids.len()).filter(|&i| !peel.placed[i]).collect();
            let remaining: Vec<VectorId> = remaining_idx.iter().map(|&i| ids[i]).collect();
            let pending_before: Vec<usize> =
                remaining_idx.iter().map(|&i| peel.pending_before[i]).collect();
            let pending_after: Vec<usize> =
                remaining_idx.iter().map(|&i| peel.pending_after[i]).collect();
            let selected = self.cut_set.select(&CutContext {
                level,
                remaining: &remaining,
                pending_before: &pending_before,
                pending_after: &pending_after,
            })?;

            let slot: HashMap<VectorId, usize> =
                remaining_idx.iter().map(|&i| (ids[i], i)).collect();
            let mut taken = 0;
            for v in selected {
                if let Some(&i) = slot.get(&v) {
                    if !peel.placed[i] {
                        cut.push(i);
                        peel.settle(i);
                        taken += 1;
                    }
                }
            }
            if taken == 0 {
                return Err(AlgebraError::inconsistency(format!(
                    "cut-set procedure selected none of {} remaining vectors",
                    remaining.len()
                )));
            }
            cut_rounds += 1;
            log::trace!("streamwise cut round {cut_rounds}: {taken} vectors");
        }

        let mut order: Vec<VectorId> = Vec::with_capacity(ids.len());
        match self.opts.layout {
            StreamwiseLayout::FirstCutLast => {
                order.extend(first.iter().chain(&first_after_cut).map(|&i| ids[i]));
                order.extend(cut.iter().map(|&i| ids[i]));
            }
            StreamwiseLayout::FirstCutRemainder => {
                order.extend(first.iter().map(|&i| ids[i]));
                order.extend(cut.iter().map(|&i| ids[i]));
                order.extend(first_after_cut.iter().map(|&i| ids[i]));
            }
        }
        order.extend(last.iter().rev().map(|&i| ids[i]));
        level.relink(&order)?;
        level.renumber()?;

        if let Some(rotation) = self.opts.circular {
            match self.geometry {
                Some(geometry) => {
                    for v in level.vector_ids() {
                        order_adjacency_circular(level, geometry, v, rotation)?;
                    }
                }
                None => log::warn!("streamwise: circular ordering requested without geometry"),
            }
        }
        crate::debug_invariants!(level.check_algebra(), "streamwise order");

        let report = StreamwiseReport {
            first: first.len() + first_after_cut.len(),
            first_after_cut: first_after_cut.len(),
            last: last.len(),
            cut_vectors: cut.iter().map(|&i| ids[i]).collect(),
            cut_rounds,
        };
        log::debug!(
            "streamwise order: first={} cut={} last={} rounds={}",
            report.first,
            report.cut(),
            report.last,
            report.cut_rounds
        );
        Ok(report)
    }
}

fn clear_dependency_flags(level: &mut AlgebraLevel) {
    for v in level.vector_ids() {
        let entries: Vec<_> = level.off_diagonal(v).map(|(m, _)| m).collect();
        for m in entries {
            if let Some(mat) = level.matrix_mut(m) {
                mat.set_up(false);
                mat.set_down(false);
            }
        }
    }
}

/// Streamwise reordering with serializable options and the default cut-set
/// procedure.
pub fn order_vectors_algebraic(
    level: &mut AlgebraLevel,
    dependency: &mut dyn DependencyProcedure,
    opts: &StreamwiseOpts,
) -> Result<StreamwiseReport, AlgebraError> {
    StreamwiseOrder::new(Forward(dependency))
        .opts(opts.clone())
        .run(level)
}

struct Forward<'d>(&'d mut dyn DependencyProcedure);

impl DependencyProcedure for Forward<'_> {
    fn label(&mut self, level: &mut AlgebraLevel) -> Result<(), AlgebraError> {
        self.0.label(level)
    }
}
