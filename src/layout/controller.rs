//! Collision-free vertical layout of comment cards.
//!
//! Every mounted comment wants to sit at its annotation's desired position.
//! Cards that would overlap are grouped into blocks and stacked, keeping the
//! pinned comment exactly at its desired position when there is one, and
//! otherwise keeping cards below the top margin.
//!
//! Recomputation is lazy: inputs mark the controller dirty and [`refresh`]
//! only does work when something changed.
//!
//! [`refresh`]: LayoutController::refresh

use super::annotation::Annotation;
use super::params::LayoutParams;
use crate::model::LocalId;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// A run of cards stacked as a unit.
#[derive(Debug, Clone)]
struct Block {
    /// Top of the first member.
    position: f64,
    /// Distance from the top of the first member to the bottom of the last,
    /// including the gaps between members.
    extent: f64,
    /// Members in stacking order.
    members: Vec<LocalId>,
    /// Offset of the pinned member from the block top, if the block holds it.
    pinned_offset: Option<f64>,
}

impl Block {
    fn bottom(&self) -> f64 {
        self.position + self.extent
    }

    /// Append `other` below this block.
    fn absorb(&mut self, other: Block, gap: f64) {
        if let Some(offset) = other.pinned_offset {
            self.pinned_offset = Some(self.extent + gap + offset);
        }
        self.extent += gap + other.extent;
        self.members.extend(other.members);
    }
}

/// Computes and caches on-screen offsets for comment cards.
#[derive(Debug)]
pub struct LayoutController {
    params: LayoutParams,
    /// Comments with a rendering handle, in registration order.
    mounted: IndexSet<LocalId>,
    /// Side-table of anchors. Weak: the host document owns them.
    annotations: HashMap<LocalId, Weak<dyn Annotation>>,
    desired: HashMap<LocalId, f64>,
    heights: HashMap<LocalId, f64>,
    calculated: HashMap<LocalId, f64>,
    pinned: Option<LocalId>,
    dirty: bool,
}

impl LayoutController {
    /// Empty controller using `params`.
    pub fn new(params: LayoutParams) -> Self {
        Self {
            params,
            mounted: IndexSet::new(),
            annotations: HashMap::new(),
            desired: HashMap::new(),
            heights: HashMap::new(),
            calculated: HashMap::new(),
            pinned: None,
            dirty: false,
        }
    }

    /// Current parameters.
    pub fn params(&self) -> LayoutParams {
        self.params
    }

    /// Replace the parameters, invalidating the layout.
    pub fn set_params(&mut self, params: LayoutParams) {
        if self.params != params {
            self.params = params;
            self.update_all_desired_positions();
            self.dirty = true;
        }
    }

    /// Whether the next [`refresh`](Self::refresh) will recompute.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Currently pinned comment.
    pub fn pinned(&self) -> Option<LocalId> {
        self.pinned
    }

    /// Record that `id` has a rendering handle and takes part in layout.
    pub fn register_comment(&mut self, id: LocalId) {
        self.mounted.insert(id);
        self.dirty = true;
    }

    /// Record that `id` lost its rendering handle.
    pub fn unregister_comment(&mut self, id: LocalId) {
        self.mounted.shift_remove(&id);
        self.dirty = true;
    }

    /// Whether `id` currently has a rendering handle.
    pub fn is_registered(&self, id: LocalId) -> bool {
        self.mounted.contains(&id)
    }

    /// Forget everything about `id`.
    pub fn remove_comment(&mut self, id: LocalId) {
        self.mounted.shift_remove(&id);
        self.annotations.remove(&id);
        self.desired.remove(&id);
        self.heights.remove(&id);
        self.calculated.remove(&id);
        if self.pinned == Some(id) {
            self.pinned = None;
        }
        self.dirty = true;
    }

    /// Attach the anchor for `id` and read its desired position.
    pub fn set_annotation(&mut self, id: LocalId, annotation: &Rc<dyn Annotation>) {
        self.annotations.insert(id, Rc::downgrade(annotation));
        self.update_desired_position(id);
        self.dirty = true;
    }

    /// The anchor for `id`, if it is still alive.
    pub fn annotation(&self, id: LocalId) -> Option<Rc<dyn Annotation>> {
        self.annotations.get(&id).and_then(Weak::upgrade)
    }

    /// Record the measured height of a card.
    ///
    /// Negative or non-finite heights are ignored.
    pub fn set_height(&mut self, id: LocalId, height: f64) {
        if !height.is_finite() || height < 0.0 {
            tracing::warn!(comment = %id, height, "ignoring invalid comment height");
            return;
        }
        if self.heights.get(&id) != Some(&height) {
            self.heights.insert(id, height);
            self.dirty = true;
        }
    }

    /// Measured height of a card, if known.
    pub fn height(&self, id: LocalId) -> Option<f64> {
        self.heights.get(&id).copied()
    }

    /// Pin a comment (or clear the pin).
    pub fn set_pinned(&mut self, id: Option<LocalId>) {
        if self.pinned != id {
            self.pinned = id;
            self.dirty = true;
        }
    }

    /// Desired position of `id` with the offset applied, if it has a live anchor.
    pub fn desired_position(&self, id: LocalId) -> Option<f64> {
        self.desired.get(&id).copied()
    }

    /// Where the card for `id` should be drawn.
    ///
    /// Falls back to the raw desired position before the first refresh or
    /// when the card is not laid out.
    pub fn position(&self, id: LocalId) -> Option<f64> {
        self.calculated
            .get(&id)
            .or_else(|| self.desired.get(&id))
            .copied()
    }

    /// All calculated positions, top to bottom.
    pub fn positions(&self) -> Vec<(LocalId, f64)> {
        let mut positions: Vec<(LocalId, f64)> =
            self.calculated.iter().map(|(id, pos)| (*id, *pos)).collect();
        positions.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        positions
    }

    fn update_desired_position(&mut self, id: LocalId) -> bool {
        let previous = self.desired.get(&id).copied();
        let current = self
            .annotations
            .get(&id)
            .and_then(Weak::upgrade)
            .map(|annotation| annotation.desired_position() + self.params.offset);

        match current {
            Some(position) => {
                self.desired.insert(id, position);
            }
            None => {
                self.desired.remove(&id);
            }
        }
        previous != current
    }

    fn update_all_desired_positions(&mut self) -> bool {
        let ids: Vec<LocalId> = self.annotations.keys().copied().collect();
        let mut changed = false;
        for id in ids {
            changed |= self.update_desired_position(id);
        }
        changed
    }

    /// Re-read desired positions from the anchors and recompute the layout if
    /// anything changed since the last refresh.
    ///
    /// Returns `true` if positions were recomputed. Idempotent: calling it again
    /// without changing any input does nothing and yields the same positions.
    pub fn refresh(&mut self) -> bool {
        if self.update_all_desired_positions() {
            self.dirty = true;
        }
        if !self.dirty {
            return false;
        }

        let (blocks, passes) = self.solve();
        self.calculated.clear();
        for block in &blocks {
            let mut current = block.position;
            for id in &block.members {
                self.calculated.insert(*id, current);
                current += self.heights.get(id).copied().unwrap_or_default() + self.params.gap;
            }
        }

        tracing::debug!(
            comments = self.calculated.len(),
            blocks = blocks.len(),
            passes,
            pinned = ?self.pinned,
            "layout refreshed"
        );

        self.dirty = false;
        true
    }

    /// Group overlapping cards into positioned blocks.
    ///
    /// Returns the blocks and the number of merge passes that ran.
    fn solve(&self) -> (Vec<Block>, usize) {
        let gap = self.params.gap;

        let mut blocks: Vec<Block> = self
            .mounted
            .iter()
            .filter_map(|id| {
                let position = *self.desired.get(id)?;
                let height = *self.heights.get(id)?;
                Some(Block {
                    position,
                    extent: height,
                    members: vec![*id],
                    pinned_offset: (self.pinned == Some(*id)).then_some(0.0),
                })
            })
            .collect();

        // A pin only counts if the pinned card is actually laid out.
        let pinned_desired = blocks
            .iter()
            .find(|block| block.pinned_offset.is_some())
            .map(|block| block.position);

        // Stable: equal positions keep registration order.
        blocks.sort_by(|a, b| a.position.total_cmp(&b.position));

        // Only the topmost block needs clamping; anything else above the
        // margin overlaps it and is stacked below by the merge.
        if pinned_desired.is_none() {
            if let Some(first) = blocks.first_mut() {
                first.position = first.position.max(self.params.min_top());
            }
        }

        // Every pass but the last merges at least two blocks, so n passes
        // always reach the fixed point.
        let max_passes = blocks.len().max(1);
        let mut passes = 0;
        loop {
            passes += 1;
            let mut merged = false;
            let mut resolved: Vec<Block> = Vec::with_capacity(blocks.len());

            for block in blocks {
                if let Some(previous) = resolved.last_mut() {
                    if previous.bottom() + gap > block.position {
                        previous.absorb(block, gap);
                        if let (Some(desired), Some(offset)) =
                            (pinned_desired, previous.pinned_offset)
                        {
                            previous.position = desired - offset;
                        }
                        merged = true;
                        continue;
                    }
                }
                resolved.push(block);
            }

            blocks = resolved;
            if !merged {
                break;
            }
            if passes >= max_passes {
                tracing::warn!(passes, "layout merge did not settle; using last pass");
                break;
            }
        }

        (blocks, passes)
    }
}

impl Default for LayoutController {
    fn default() -> Self {
        Self::new(LayoutParams::default())
    }
}

// ===== Tests =====

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
