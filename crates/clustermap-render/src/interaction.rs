//! Drag gestures and one-shot layout operations.
//!
//! Every drag is `idle -> dragging -> idle`: `start` on pointer down, any number of `drag` steps,
//! then `end`, which always commits. While dragging, feedback goes through
//! [`LiveTransforms`](crate::geometry::LiveTransforms) and only the dragged entity's own scale
//! entries are written, with two exceptions: a reorder step moves exactly one displaced cluster,
//! and the left resize handle writes the owning cluster's offset.

use crate::scales::{OffsetScale, ScaleRegistry};
use crate::state::DiagramState;
use clustermap_core::Bp;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// A cluster moved to another row during a reorder step.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSwap {
    pub displaced: String,
    pub slot: usize,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct ClusterReorder {
    pub cluster: String,
    start_y: f64,
    initial_y: f64,
}

impl ClusterReorder {
    pub fn start(state: &DiagramState, cluster: &str, y: f64) -> Option<Self> {
        state.diagram.cluster(cluster)?;
        let initial_y = *state.scales.cluster_order.get(cluster);
        tracing::debug!(cluster, initial_y, "cluster reorder started");
        Some(Self {
            cluster: cluster.to_string(),
            start_y: y,
            initial_y,
        })
    }

    /// Moves the dragged row to follow the pointer and swaps it with the occupant of the nearest
    /// slot, if that is not its own.
    pub fn drag(&mut self, state: &mut DiagramState, y: f64) -> Option<SlotSwap> {
        let pitch = ScaleRegistry::row_pitch(&state.config);
        let total = state.scales.total_height();
        let yy = (self.initial_y + y - self.start_y).clamp(0.0, total);
        state.live.cluster_y.insert(self.cluster.clone(), yy);

        let count = state.diagram.cluster_count();
        if pitch <= 0.0 || count == 0 {
            return None;
        }
        let target = ((yy / pitch).round().max(0.0) as usize).min(count - 1);
        let current = state.diagram.cluster(&self.cluster)?.slot;
        if target == current {
            return None;
        }
        let displaced = state
            .diagram
            .clusters()
            .find(|c| c.slot == target)?
            .uid
            .clone();
        if let Some(cluster) = state.diagram.cluster_mut(&displaced) {
            cluster.slot = current;
        }
        if let Some(cluster) = state.diagram.cluster_mut(&self.cluster) {
            cluster.slot = target;
        }
        let y = current as f64 * pitch;
        state
            .scales
            .update_scale_range(OffsetScale::ClusterOrder, &displaced, y);
        tracing::trace!(cluster = %self.cluster, displaced = %displaced, target, "slot swap");
        Some(SlotSwap {
            displaced,
            slot: current,
            y,
        })
    }

    pub fn end(self, state: &mut DiagramState) {
        state.live.cluster_y.remove(&self.cluster);
        state
            .scales
            .rebuild_cluster_order(&mut state.diagram, &state.config);
        tracing::debug!(cluster = %self.cluster, "cluster reorder ended");
    }
}

#[derive(Debug, Clone)]
pub struct LocusReposition {
    pub locus: String,
    pub cluster: String,
    start_x: f64,
    initial: f64,
}

impl LocusReposition {
    pub fn start(state: &DiagramState, locus: &str, x: f64) -> Option<Self> {
        let cluster = state.diagram.locus(locus)?.cluster.clone();
        let initial = *state.scales.locus_offset.get(locus);
        tracing::debug!(locus, initial, "locus reposition started");
        Some(Self {
            locus: locus.to_string(),
            cluster,
            start_x: x,
            initial,
        })
    }

    /// Returns the locus offset now shown.
    pub fn drag(&mut self, state: &mut DiagramState, x: f64) -> f64 {
        let value = self.initial + x - self.start_x;
        state.live.locus_x.insert(self.locus.clone(), value);
        tracing::trace!(locus = %self.locus, value, "locus drag");
        value
    }

    pub fn end(self, state: &mut DiagramState) {
        let value = state
            .live
            .locus_x
            .remove(&self.locus)
            .unwrap_or(self.initial);
        state
            .scales
            .update_scale_range(OffsetScale::LocusOffset, &self.locus, value);
        tracing::debug!(locus = %self.locus, value, "locus reposition committed");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSide {
    Left,
    Right,
}

/// Visible bounds after a resize step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeStep {
    pub visible_start: Bp,
    pub visible_end: Bp,
    /// Pixels subtracted from the cluster offset (left handle only).
    pub cluster_shift: f64,
}

#[derive(Debug, Clone)]
pub struct LocusResize {
    pub locus: String,
    pub cluster: String,
    pub side: HandleSide,
    /// Sorted candidate boundaries.
    candidates: Vec<Bp>,
}

impl LocusResize {
    /// Left handle candidates are the locus start and the starts of genes ending within the
    /// visible end; right handle candidates are the ends of genes starting within the visible
    /// start and the locus end. Neither set can cross the opposite bound.
    pub fn start(state: &DiagramState, locus_uid: &str, side: HandleSide) -> Option<Self> {
        let locus = state.diagram.locus(locus_uid)?;
        let display = locus.display;
        let genes = state.diagram.genes_of(locus);
        let mut candidates: Vec<Bp> = match side {
            HandleSide::Left => std::iter::once(locus.start)
                .chain(
                    genes
                        .filter(|g| g.display.end <= display.visible_end)
                        .map(|g| g.display.start),
                )
                .collect(),
            HandleSide::Right => genes
                .filter(|g| g.display.start >= display.visible_start)
                .map(|g| g.display.end)
                .chain(std::iter::once(locus.end))
                .collect(),
        };
        candidates.sort_unstable();
        candidates.dedup();
        tracing::debug!(
            locus = locus_uid,
            ?side,
            candidates = candidates.len(),
            "locus resize started"
        );
        Some(Self {
            locus: locus_uid.to_string(),
            cluster: locus.cluster.clone(),
            side,
            candidates,
        })
    }

    /// Candidate whose scaled coordinate is nearest to `x` (locus-local pixels). Ties go to the
    /// lower candidate.
    pub fn nearest(&self, scales: &ScaleRegistry, x: f64) -> Option<Bp> {
        let coords: Vec<f64> = self
            .candidates
            .iter()
            .map(|&bp| scales.x(bp as f64))
            .collect();
        let index = coords.partition_point(|&c| c < x);
        let best = match (index.checked_sub(1), coords.get(index)) {
            (Some(below), Some(&above)) => {
                if x - coords[below] <= above - x {
                    below
                } else {
                    index
                }
            }
            (Some(below), None) => below,
            (None, Some(_)) => index,
            (None, None) => return None,
        };
        self.candidates.get(best).copied()
    }

    /// Snaps the handle to the nearest candidate. Returns `None` when the bound did not move.
    pub fn drag(&mut self, state: &mut DiagramState, x: f64) -> Option<ResizeStep> {
        let bound = self.nearest(&state.scales, x)?;
        let display = state.diagram.locus(&self.locus)?.display;
        let (start, end) = match self.side {
            HandleSide::Left if bound != display.visible_start => (bound, display.visible_end),
            HandleSide::Right if bound != display.visible_end => (display.visible_start, bound),
            _ => return None,
        };
        if !state.diagram.set_visible_bounds(&self.locus, start, end) {
            return None;
        }

        let mut cluster_shift = 0.0;
        if self.side == HandleSide::Left {
            cluster_shift =
                state.scales.x(start as f64) - state.scales.x(display.visible_start as f64);
            let offset = *state.scales.cluster_offset.get(self.cluster.as_str());
            state.scales.update_scale_range(
                OffsetScale::ClusterOffset,
                &self.cluster,
                offset - cluster_shift,
            );
        }
        tracing::trace!(locus = %self.locus, start, end, "locus resize step");
        Some(ResizeStep {
            visible_start: start,
            visible_end: end,
            cluster_shift,
        })
    }

    pub fn end(self, _state: &mut DiagramState) {
        tracing::debug!(locus = %self.locus, side = ?self.side, "locus resize ended");
    }
}

/// Flips a locus and keeps its visible left edge where it was.
pub fn flip_locus(state: &mut DiagramState, locus_uid: &str) -> bool {
    let Some(before) = state.diagram.flip_locus(locus_uid) else {
        return false;
    };
    let Some(after) = state.diagram.locus(locus_uid).map(|l| l.display) else {
        return false;
    };
    let shift =
        state.scales.x(before.visible_start as f64) - state.scales.x(after.visible_start as f64);
    let offset = *state.scales.locus_offset.get(locus_uid);
    state
        .scales
        .locus_offset
        .set(locus_uid.to_string(), offset + shift);
    tracing::debug!(locus = locus_uid, flipped = after.flipped, "flipped locus");
    true
}

/// Shifts every cluster holding a gene of the clicked gene's group so that its nearest such gene
/// lines up with the clicked gene's midpoint. Offsets are added to the current cluster offsets;
/// the clicked gene's own cluster does not move.
///
/// Returns the applied shifts by cluster uid.
pub fn anchor_on_gene(state: &mut DiagramState, gene_uid: &str) -> IndexMap<String, f64> {
    let mut shifts: IndexMap<String, f64> = IndexMap::new();
    let Some(gene) = state.diagram.gene(gene_uid) else {
        return shifts;
    };
    let Some(group) = state.scales.group_of(gene_uid) else {
        return shifts;
    };

    let placement = state.placement();
    let target = placement.gene_midpoint(gene);
    for (uid, other_group) in state.scales.group.iter() {
        if *other_group != Some(group) {
            continue;
        }
        let Some(other) = state.diagram.gene(uid) else {
            continue;
        };
        if other.cluster == gene.cluster {
            continue;
        }
        let offset = target - placement.gene_midpoint(other);
        match shifts.get_mut(other.cluster.as_str()) {
            Some(best) if offset.abs() < best.abs() => *best = offset,
            Some(_) => {}
            None => {
                shifts.insert(other.cluster.clone(), offset);
            }
        }
    }

    for (cluster, shift) in &shifts {
        let offset = *state.scales.cluster_offset.get(cluster.as_str());
        state
            .scales
            .update_scale_range(OffsetScale::ClusterOffset, cluster, offset + shift);
    }
    tracing::debug!(gene = gene_uid, clusters = shifts.len(), "anchored on gene");
    shifts
}

/// An in-progress drag.
#[derive(Debug, Clone)]
pub enum Gesture {
    Reorder(ClusterReorder),
    Reposition(LocusReposition),
    Resize(LocusResize),
}

/// Drags in progress, keyed by pointer id.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    gestures: FxHashMap<u32, Gesture>,
}

impl Interaction {
    /// True while any drag is in progress; hover affordances are suppressed meanwhile.
    pub fn is_dragging(&self) -> bool {
        !self.gestures.is_empty()
    }

    pub fn begin(&mut self, pointer_id: u32, gesture: Gesture) {
        self.gestures.insert(pointer_id, gesture);
    }

    pub fn get_mut(&mut self, pointer_id: u32) -> Option<&mut Gesture> {
        self.gestures.get_mut(&pointer_id)
    }

    pub fn finish(&mut self, pointer_id: u32) -> Option<Gesture> {
        self.gestures.remove(&pointer_id)
    }

    pub fn clear(&mut self) {
        self.gestures.clear();
    }
}
