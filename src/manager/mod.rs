//! # The memory manager
//!
//! The manager simulates a single arena of cells, addressed `1..=memory_size`, partitioned into
//! segments tagged free or used. Two structures are kept mutually consistent under every
//! mutation:
//!
//! - the [segment ledger](segments::SegmentList), an address-ordered doubly-linked sequence that
//!   makes coalescing with a neighbor O(1), and
//! - the [free-segment heap](heap::TrackedHeap), which yields the best allocation candidate in
//!   O(log n) and supports O(log n) removal of an arbitrary free segment once it stops being free.
//!
//! Allocation is worst-fit: the candidate is always the largest free segment, with ties broken
//! towards the lower address. Released segments are merged with their free neighbors eagerly, so
//! no two adjacent free segments ever persist.

use crate::manager::heap::TrackedHeap;
use crate::manager::segments::{MemorySegment, SegmentId, SegmentList};

pub mod heap;
pub mod segments;

/// Decides where each allocation lands within a fixed arena, and reclaims released segments.
#[derive(Debug)]
pub struct MemoryManager {
    segments: SegmentList,
    free_segments: TrackedHeap<SegmentId>,
}

impl MemoryManager {
    /// Creates a manager for an arena of `memory_size` cells, entirely free.
    pub fn new(memory_size: usize) -> Self {
        let mut segments = SegmentList::new(memory_size);
        let mut free_segments = TrackedHeap::new();
        // A fresh ledger contains exactly one segment, spanning the arena.
        let arena = segments.first().unwrap();
        free_segments.push(arena, &mut segments);
        Self {
            segments,
            free_segments,
        }
    }

    /// Returns the segment ledger, for inspection.
    pub fn segments(&self) -> &SegmentList {
        &self.segments
    }

    /// Allocates `size` consecutive cells, `size >= 1`.
    ///
    /// On success, returns the starting address of the block and the handle of the used segment
    /// that covers exactly `[address, address + size - 1]`. Returns [`None`] when no free segment
    /// is large enough, in which case nothing changes.
    pub fn allocate(&mut self, size: usize) -> Option<(usize, SegmentId)> {
        let &candidate = self.free_segments.top()?;
        if self.segments.get(candidate).size() < size {
            return None;
        }
        self.free_segments.pop(&mut self.segments);
        let allocated = if self.segments.get(candidate).size() == size {
            // Exact fit: the segment becomes used in place.
            candidate
        } else {
            // Split: the used head is spliced in before the remainder, which shrinks and goes
            // back into the heap.
            let left = self.segments.get(candidate).left;
            let used = MemorySegment::new(left, left + size - 1);
            let used_id = self.segments.insert_before(candidate, used);
            self.segments.get_mut(candidate).left += size;
            self.free_segments.push(candidate, &mut self.segments);
            used_id
        };
        debug_assert!(self.test_consistency(), "the ledger and the heap should agree");
        Some((self.segments.get(allocated).left, allocated))
    }

    /// Releases a used segment, merging it with its free neighbors.
    ///
    /// Panics if `id` does not denote a currently used segment; presenting only live handles is
    /// the caller's contract.
    pub fn free(&mut self, id: SegmentId) {
        assert!(!self.segments.get(id).is_free(), "segment {:?} is already free", id);
        // Successor first, then predecessor. Each merge recomputes the covering range from the
        // two segments involved, and `id` keeps denoting the surviving segment.
        if let Some(successor) = self.segments.next(id) {
            self.append_if_free(id, successor);
        }
        if let Some(predecessor) = self.segments.previous(id) {
            self.append_if_free(id, predecessor);
        }
        self.free_segments.push(id, &mut self.segments);
        debug_assert!(self.test_consistency(), "the ledger and the heap should agree");
        debug_assert!(self.test_no_adjacent_free(), "released segments should coalesce");
    }

    /// If `neighbor` is free, absorbs it into the segment denoted by `remaining`: the neighbor
    /// leaves the heap and the ledger, and `remaining` extends to cover both ranges.
    fn append_if_free(&mut self, remaining: SegmentId, neighbor: SegmentId) {
        if let Some(slot) = self.segments.get(neighbor).heap_slot {
            self.free_segments.remove(slot, &mut self.segments);
            let united = self.segments.get(remaining).unite(self.segments.get(neighbor));
            self.segments.remove(neighbor);
            let segment = self.segments.get_mut(remaining);
            segment.left = united.left;
            segment.right = united.right;
        }
    }

    /// Tests if the free segments and the heap agree: every free segment's cached slot points
    /// back at it, the heap holds nothing else, and the ledger still partitions the arena.
    pub(crate) fn test_consistency(&self) -> bool {
        let mut free_count = 0;
        for (id, segment) in self.segments.iter() {
            if let Some(slot) = segment.heap_slot {
                free_count += 1;
                if self.free_segments.get(slot) != Some(&id) {
                    return false;
                }
            }
        }
        free_count == self.free_segments.len() && self.segments.test_partition()
    }

    /// Tests that no two address-adjacent segments are both free.
    pub(crate) fn test_no_adjacent_free(&self) -> bool {
        let mut previous_free = false;
        for (_, segment) in self.segments.iter() {
            if segment.is_free() && previous_free {
                return false;
            }
            previous_free = segment.is_free();
        }
        true
    }
}
