//! Fixed-capacity pool of animated visual-effect instances.
//!
//! The pool owns one physical array of slots. The first `visible_count`
//! entries are the visible instances, the rest are hidden, so a renderer can
//! upload `visible_slots()` as a single contiguous range. Showing or hiding a
//! slot swaps it with the slot at the partition boundary instead of shifting
//! the array; each slot keeps a stable [`SlotId`] across swaps.
//!
//! Animation completion is reported as a return value of [`InstancePool::tick_all`]
//! rather than through a callback, so an owner being torn down simply stops
//! asking.

use crate::fixed::{Fixed64, Seconds};
use crate::id::{Position, SlotId};
use crate::registry::AttackTypeDef;
use tracing::debug;

/// Errors from direct pool calls. All of them mean the caller holds a stale
/// or invalid slot id or frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("slot {0:?} does not exist in this pool")]
    UnknownSlot(SlotId),
    #[error("slot {0:?} is not allocated")]
    NotAllocated(SlotId),
    #[error("frame {frame} out of range for slot {slot:?} (frame count {frame_count})")]
    FrameOutOfRange {
        slot: SlotId,
        frame: u32,
        frame_count: u32,
    },
    #[error("speed {speed} for slot {slot:?} must be positive")]
    InvalidSpeed { slot: SlotId, speed: Fixed64 },
}

/// Where a beam instance is drawn: from the attacking node to its target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlotTransform {
    pub from: Position,
    pub to: Position,
}

/// One physical entry of the pool.
#[derive(Debug, Clone)]
pub struct Slot {
    id: SlotId,
    transform: SlotTransform,
    frame: u32,
    playing: bool,
    speed: Fixed64,
    /// Scaled time accumulated towards the next frame.
    elapsed: Seconds,
}

impl Slot {
    fn new(id: SlotId) -> Self {
        Self {
            id,
            transform: SlotTransform::default(),
            frame: 0,
            playing: false,
            speed: Fixed64::ONE,
            elapsed: Fixed64::ZERO,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn transform(&self) -> SlotTransform {
        self.transform
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> Fixed64 {
        self.speed
    }

    /// Advance by `delta` scaled by the slot's speed. Returns true when this
    /// call carried playback past the last frame.
    fn advance(&mut self, delta: Seconds, frame_interval: Seconds, last_frame: u32) -> bool {
        if !self.playing || delta <= Fixed64::ZERO {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(delta.saturating_mul(self.speed));
        let steps = (self.elapsed / frame_interval).to_num::<u64>();
        if steps == 0 {
            return false;
        }
        self.elapsed -= frame_interval * Fixed64::from_num(steps);

        let target = u64::from(self.frame) + steps;
        if target > u64::from(last_frame) {
            self.frame = last_frame;
            self.playing = false;
            self.elapsed = Fixed64::ZERO;
            return true;
        }
        self.frame = target as u32;
        false
    }
}

/// A fixed-capacity pool of animated instances.
#[derive(Debug, Clone)]
pub struct InstancePool {
    frame_count: u32,
    frame_interval: Seconds,
    /// Physical order. `slots[..visible_count]` are visible.
    slots: Vec<Slot>,
    /// Physical index of each slot, indexed by `SlotId`.
    index_of: Vec<usize>,
    /// Allocation flag of each slot, indexed by `SlotId`.
    allocated: Vec<bool>,
    allocated_count: usize,
    visible_count: usize,
}

impl InstancePool {
    /// Create a pool of `capacity` hidden, unallocated slots.
    ///
    /// A `frame_count` of 0 is clamped to 1 and a non-positive
    /// `frame_interval` to the smallest representable step.
    pub fn new(capacity: usize, frame_count: u32, frame_interval: Seconds) -> Self {
        Self {
            frame_count: frame_count.max(1),
            frame_interval: frame_interval.max(Fixed64::DELTA),
            slots: (0..capacity).map(|i| Slot::new(SlotId(i as u32))).collect(),
            index_of: (0..capacity).collect(),
            allocated: vec![false; capacity],
            allocated_count: 0,
            visible_count: 0,
        }
    }

    /// A pool shaped for one attack type's beams.
    pub fn for_attack(def: &AttackTypeDef) -> Self {
        Self::new(def.pool_capacity, def.frame_count, def.frame_interval)
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    /// Claim a free slot. `None` when every slot is in use, which callers
    /// treat as ordinary game feedback.
    pub fn allocate(&mut self) -> Option<SlotId> {
        let free = self.allocated.iter().position(|&a| !a)?;
        self.allocated[free] = true;
        self.allocated_count += 1;
        let id = SlotId(free as u32);
        debug!(slot = ?id, in_use = self.allocated_count, "pool slot allocated");
        Some(id)
    }

    /// Return a slot to the pool: hidden, stopped, rewound.
    pub fn release(&mut self, id: SlotId) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        self.hide(id)?;
        let slot = self.slot_mut(id);
        slot.frame = 0;
        slot.playing = false;
        slot.elapsed = Fixed64::ZERO;
        slot.speed = Fixed64::ONE;
        self.allocated[id.index()] = false;
        self.allocated_count -= 1;
        debug!(slot = ?id, in_use = self.allocated_count, "pool slot released");
        Ok(())
    }

    /// Release every allocated slot.
    pub fn release_all(&mut self) {
        for i in 0..self.allocated.len() {
            if self.allocated[i] {
                // The id is in range and allocated, so this cannot fail.
                let _ = self.release(SlotId(i as u32));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    /// Make a slot visible by swapping it to the end of the visible prefix.
    pub fn show(&mut self, id: SlotId) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        let index = self.index_of[id.index()];
        if index < self.visible_count {
            return Ok(());
        }
        self.swap(index, self.visible_count);
        self.visible_count += 1;
        Ok(())
    }

    /// Hide a slot by swapping it with the last visible slot.
    pub fn hide(&mut self, id: SlotId) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        let index = self.index_of[id.index()];
        if index >= self.visible_count {
            return Ok(());
        }
        self.swap(index, self.visible_count - 1);
        self.visible_count -= 1;
        Ok(())
    }

    /// Exchange two physical entries and patch the id-to-index map.
    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.slots.swap(i, j);
        self.index_of[self.slots[i].id.index()] = i;
        self.index_of[self.slots[j].id.index()] = j;
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    /// Jump to a frame. Out-of-range frames are a caller error.
    pub fn set_frame(&mut self, id: SlotId, frame: u32) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        if frame >= self.frame_count {
            return Err(PoolError::FrameOutOfRange {
                slot: id,
                frame,
                frame_count: self.frame_count,
            });
        }
        let slot = self.slot_mut(id);
        slot.frame = frame;
        slot.elapsed = Fixed64::ZERO;
        Ok(())
    }

    /// Start (or resume) playback from the current frame.
    pub fn play(&mut self, id: SlotId) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        self.slot_mut(id).playing = true;
        Ok(())
    }

    /// Rewind to frame 0 and play.
    pub fn restart(&mut self, id: SlotId) -> Result<(), PoolError> {
        self.set_frame(id, 0)?;
        self.play(id)
    }

    pub fn stop(&mut self, id: SlotId) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        self.slot_mut(id).playing = false;
        Ok(())
    }

    /// Set the per-instance animation speed multiplier. Must be positive.
    pub fn set_speed(&mut self, id: SlotId, speed: Fixed64) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        if speed <= Fixed64::ZERO {
            return Err(PoolError::InvalidSpeed { slot: id, speed });
        }
        self.slot_mut(id).speed = speed;
        Ok(())
    }

    pub fn set_transform(&mut self, id: SlotId, transform: SlotTransform) -> Result<(), PoolError> {
        self.check_allocated(id)?;
        self.slot_mut(id).transform = transform;
        Ok(())
    }

    /// Advance one slot. Clamps at the last frame instead of failing; returns
    /// true exactly once per crossing of the last frame.
    pub fn tick(&mut self, id: SlotId, delta: Seconds) -> Result<bool, PoolError> {
        self.check_allocated(id)?;
        let (interval, last) = (self.frame_interval, self.frame_count - 1);
        Ok(self.slot_mut(id).advance(delta, interval, last))
    }

    /// Advance every visible, playing slot. Returns the slots whose playback
    /// finished during this call, in physical order.
    pub fn tick_all(&mut self, delta: Seconds) -> Vec<SlotId> {
        let (interval, last) = (self.frame_interval, self.frame_count - 1);
        let mut completed = Vec::new();
        for slot in &mut self.slots[..self.visible_count] {
            if slot.advance(delta, interval, last) {
                completed.push(slot.id);
            }
        }
        completed
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    pub fn is_saturated(&self) -> bool {
        self.allocated_count == self.slots.len()
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn frame_interval(&self) -> Seconds {
        self.frame_interval
    }

    pub fn is_allocated(&self, id: SlotId) -> bool {
        self.allocated.get(id.index()).copied().unwrap_or(false)
    }

    pub fn is_visible(&self, id: SlotId) -> bool {
        self.physical_index(id)
            .is_some_and(|index| index < self.visible_count)
    }

    /// Current physical index of a slot.
    pub fn physical_index(&self, id: SlotId) -> Option<usize> {
        self.index_of.get(id.index()).copied()
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.physical_index(id).map(|index| &self.slots[index])
    }

    /// The visible prefix, in the order a renderer should draw it.
    pub fn visible_slots(&self) -> &[Slot] {
        &self.slots[..self.visible_count]
    }

    /// Check the id/index bookkeeping. Used by tests and fuzzing.
    pub fn is_consistent(&self) -> bool {
        let visible_ok = self.visible_count <= self.slots.len();
        let map_ok = self
            .slots
            .iter()
            .enumerate()
            .all(|(index, slot)| self.index_of[slot.id.index()] == index);
        let visible_allocated_ok = self.slots[..self.visible_count]
            .iter()
            .all(|slot| self.allocated[slot.id.index()]);
        let count_ok = self.allocated.iter().filter(|&&a| a).count() == self.allocated_count;
        visible_ok && map_ok && visible_allocated_ok && count_ok
    }

    fn check_allocated(&self, id: SlotId) -> Result<(), PoolError> {
        match self.allocated.get(id.index()) {
            None => Err(PoolError::UnknownSlot(id)),
            Some(false) => Err(PoolError::NotAllocated(id)),
            Some(true) => Ok(()),
        }
    }

    fn slot_mut(&mut self, id: SlotId) -> &mut Slot {
        let index = self.index_of[id.index()];
        &mut self.slots[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval() -> Seconds {
        Fixed64::from_num(1) / Fixed64::from_num(10)
    }

    fn pool(capacity: usize) -> InstancePool {
        InstancePool::new(capacity, 4, interval())
    }

    #[test]
    fn allocate_until_saturated() {
        let mut p = pool(2);
        let a = p.allocate().unwrap();
        let b = p.allocate().unwrap();
        assert_ne!(a, b);
        assert!(p.is_saturated());
        assert_eq!(p.allocate(), None);
    }

    #[test]
    fn released_slot_is_reused() {
        let mut p = pool(2);
        let a = p.allocate().unwrap();
        let _b = p.allocate().unwrap();
        p.release(a).unwrap();
        assert!(!p.is_allocated(a));
        assert_eq!(p.allocate(), Some(a));
    }

    #[test]
    fn double_release_is_an_error() {
        let mut p = pool(1);
        let a = p.allocate().unwrap();
        p.release(a).unwrap();
        assert_eq!(p.release(a), Err(PoolError::NotAllocated(a)));
        assert_eq!(p.release(SlotId(9)), Err(PoolError::UnknownSlot(SlotId(9))));
    }

    #[test]
    fn show_then_hide_restores_visible_count() {
        let mut p = pool(4);
        let ids: Vec<SlotId> = (0..4).map(|_| p.allocate().unwrap()).collect();
        p.show(ids[0]).unwrap();
        p.show(ids[2]).unwrap();
        assert_eq!(p.visible_count(), 2);

        p.show(ids[3]).unwrap();
        assert_eq!(p.visible_count(), 3);
        p.hide(ids[3]).unwrap();
        assert_eq!(p.visible_count(), 2);
        assert!(p.is_visible(ids[0]) && p.is_visible(ids[2]));
        assert!(!p.is_visible(ids[3]));
        assert!(p.is_consistent());
    }

    #[test]
    fn show_and_hide_are_idempotent() {
        let mut p = pool(3);
        let a = p.allocate().unwrap();
        p.hide(a).unwrap();
        assert_eq!(p.visible_count(), 0);
        p.show(a).unwrap();
        p.show(a).unwrap();
        assert_eq!(p.visible_count(), 1);
    }

    #[test]
    fn hide_swaps_with_last_visible() {
        let mut p = pool(3);
        let ids: Vec<SlotId> = (0..3).map(|_| p.allocate().unwrap()).collect();
        for &id in &ids {
            p.show(id).unwrap();
        }
        p.hide(ids[0]).unwrap();

        // The last visible slot moved into the hole; the hidden one sits at
        // the boundary.
        assert_eq!(p.physical_index(ids[2]), Some(0));
        assert_eq!(p.physical_index(ids[0]), Some(2));
        let visible: Vec<SlotId> = p.visible_slots().iter().map(|s| s.id()).collect();
        assert_eq!(visible, vec![ids[2], ids[1]]);
    }

    #[test]
    fn swap_carries_frame_and_transform() {
        let mut p = pool(2);
        let a = p.allocate().unwrap();
        let b = p.allocate().unwrap();
        let t = SlotTransform {
            from: Position::new(1.0, 2.0, 3.0),
            to: Position::ORIGIN,
        };
        p.set_transform(b, t).unwrap();
        p.set_frame(b, 3).unwrap();
        p.show(b).unwrap();

        assert_eq!(p.physical_index(b), Some(0));
        let slot = p.slot(b).unwrap();
        assert_eq!(slot.frame(), 3);
        assert_eq!(slot.transform(), t);
        assert_eq!(p.slot(a).unwrap().frame(), 0);
    }

    #[test]
    fn set_frame_out_of_range_fails() {
        let mut p = pool(1);
        let a = p.allocate().unwrap();
        assert_eq!(
            p.set_frame(a, 4),
            Err(PoolError::FrameOutOfRange {
                slot: a,
                frame: 4,
                frame_count: 4
            })
        );
        p.set_frame(a, 3).unwrap();
    }

    #[test]
    fn release_rewinds_and_hides() {
        let mut p = pool(1);
        let a = p.allocate().unwrap();
        p.show(a).unwrap();
        p.restart(a).unwrap();
        p.tick_all(interval() * Fixed64::from_num(2));
        assert_eq!(p.slot(a).unwrap().frame(), 2);

        p.release(a).unwrap();
        let slot = p.slot(a).unwrap();
        assert_eq!(slot.frame(), 0);
        assert!(!slot.is_playing());
        assert_eq!(p.visible_count(), 0);
    }

    #[test]
    fn tick_all_advances_by_whole_frames() {
        let mut p = pool(1);
        let a = p.allocate().unwrap();
        p.show(a).unwrap();
        p.play(a).unwrap();

        // Half a frame does nothing yet; the remainder carries over.
        p.tick_all(interval() / Fixed64::from_num(2));
        assert_eq!(p.slot(a).unwrap().frame(), 0);
        p.tick_all(interval() / Fixed64::from_num(2));
        assert_eq!(p.slot(a).unwrap().frame(), 1);
    }

    #[test]
    fn completion_reported_once() {
        let mut p = pool(1);
        let a = p.allocate().unwrap();
        p.show(a).unwrap();
        p.play(a).unwrap();

        // Frames 0..=3; reaching frame 3 is not yet a completion.
        assert!(p.tick_all(interval() * Fixed64::from_num(3)).is_empty());
        assert_eq!(p.tick_all(interval()), vec![a]);
        assert!(!p.slot(a).unwrap().is_playing());
        assert_eq!(p.slot(a).unwrap().frame(), 3);
        assert!(p.tick_all(interval() * Fixed64::from_num(10)).is_empty());
    }

    #[test]
    fn large_delta_clamps_to_last_frame() {
        let mut p = pool(1);
        let a = p.allocate().unwrap();
        p.play(a).unwrap();
        assert!(p.tick(a, Fixed64::from_num(100)).unwrap());
        assert_eq!(p.slot(a).unwrap().frame(), 3);
    }

    #[test]
    fn hidden_slots_do_not_advance() {
        let mut p = pool(2);
        let a = p.allocate().unwrap();
        p.play(a).unwrap();
        assert!(p.tick_all(Fixed64::from_num(10)).is_empty());
        assert_eq!(p.slot(a).unwrap().frame(), 0);
    }

    #[test]
    fn speed_multiplier_scales_playback() {
        let mut p = pool(2);
        let fast = p.allocate().unwrap();
        let slow = p.allocate().unwrap();
        for id in [fast, slow] {
            p.show(id).unwrap();
            p.play(id).unwrap();
        }
        p.set_speed(fast, Fixed64::from_num(2)).unwrap();
        p.tick_all(interval());
        assert_eq!(p.slot(fast).unwrap().frame(), 2);
        assert_eq!(p.slot(slow).unwrap().frame(), 1);
    }

    #[test]
    fn non_positive_speed_is_rejected() {
        let mut p = pool(1);
        let id = p.allocate().unwrap();
        p.show(id).unwrap();
        p.play(id).unwrap();
        for speed in [Fixed64::ZERO, Fixed64::from_num(-1)] {
            assert!(matches!(
                p.set_speed(id, speed),
                Err(PoolError::InvalidSpeed { slot, .. }) if slot == id
            ));
        }
        assert_eq!(p.slot(id).unwrap().speed(), Fixed64::ONE);
        p.tick_all(Fixed64::ONE);
        assert!(p.slot(id).unwrap().frame() > 0);
    }

    #[test]
    fn release_all_frees_everything() {
        let mut p = pool(3);
        for _ in 0..3 {
            let id = p.allocate().unwrap();
            p.show(id).unwrap();
        }
        p.release_all();
        assert_eq!(p.allocated_count(), 0);
        assert_eq!(p.visible_count(), 0);
        assert!(p.is_consistent());
    }

    #[test]
    fn zero_capacity_pool_is_always_saturated() {
        let mut p = InstancePool::new(0, 0, Fixed64::ZERO);
        assert!(p.is_saturated());
        assert_eq!(p.allocate(), None);
        assert_eq!(p.frame_count(), 1);
        assert!(p.tick_all(Fixed64::ONE).is_empty());
    }
}
