use std::fmt;
use std::fmt::{Display, Formatter};

use crate::manager::heap::{HeapContext, HeapSlot};

/// An inclusive range of cells `[left, right]` within the arena, tagged free or used.
///
/// A segment is free if, and only if, it currently sits in the free-segment heap; `heap_slot`
/// caches its slot there, and is kept accurate by the heap's slot-change notifications.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct MemorySegment {
    pub left: usize,
    pub right: usize,
    /// The segment's cached slot in the free-segment heap. `None` for used segments.
    pub heap_slot: Option<HeapSlot>,
}

impl MemorySegment {
    /// Creates a new segment covering `[left, right]`, not yet in the heap.
    pub fn new(left: usize, right: usize) -> Self {
        Self {
            left,
            right,
            heap_slot: None,
        }
    }

    /// Returns the number of cells in this segment.
    #[inline]
    pub fn size(&self) -> usize {
        self.right - self.left + 1
    }

    /// Tests if this segment is currently free.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.heap_slot.is_some()
    }

    /// Returns the smallest segment covering both this segment and `other`.
    pub fn unite(&self, other: &MemorySegment) -> MemorySegment {
        MemorySegment::new(self.left.min(other.left), self.right.max(other.right))
    }
}

impl Display for MemorySegment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.heap_slot {
            Some(slot) => write!(f, "[{}, free{{{}}}, {}]", self.left, slot, self.right),
            None => write!(f, "[{}, used, {}]", self.left, self.right),
        }
    }
}


/// A stable handle to a segment in a [`SegmentList`].
///
/// Handles remain valid across splices and erasures elsewhere in the list; a handle is
/// invalidated only when its own segment is erased.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SegmentId(usize);

#[derive(Debug)]
struct SegmentNode {
    segment: MemorySegment,
    previous: Option<SegmentId>,
    next: Option<SegmentId>,
}

/// The address-ordered sequence of segments partitioning the arena.
///
/// The list is doubly linked through a slot-map backing: nodes live in a `Vec`, links are slot
/// indices, and erased slots are recycled through a vacant list. This is what gives
/// [`SegmentId`]s their stability. Accessing an erased segment panics.
#[derive(Debug)]
pub struct SegmentList {
    slots: Vec<Option<SegmentNode>>,
    vacant: Vec<usize>,
    first: Option<SegmentId>,
    last: Option<SegmentId>,
    len: usize,
    memory_size: usize,
}

impl SegmentList {
    /// Creates a ledger containing a single segment spanning the whole arena `[1, memory_size]`.
    pub fn new(memory_size: usize) -> Self {
        let node = SegmentNode {
            segment: MemorySegment::new(1, memory_size),
            previous: None,
            next: None,
        };
        Self {
            slots: vec![Some(node)],
            vacant: Vec::new(),
            first: Some(SegmentId(0)),
            last: Some(SegmentId(0)),
            len: 1,
            memory_size,
        }
    }

    /// Returns the number of segments in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the handle of the segment with the lowest address.
    pub fn first(&self) -> Option<SegmentId> {
        self.first
    }

    fn node(&self, id: SegmentId) -> &SegmentNode {
        match &self.slots[id.0] {
            Some(node) => node,
            None => panic!("segment {:?} was erased", id),
        }
    }

    fn node_mut(&mut self, id: SegmentId) -> &mut SegmentNode {
        match &mut self.slots[id.0] {
            Some(node) => node,
            None => panic!("segment {:?} was erased", id),
        }
    }

    /// Returns the segment denoted by `id`. Panics if the segment was erased.
    pub fn get(&self, id: SegmentId) -> &MemorySegment {
        &self.node(id).segment
    }

    /// Returns the segment denoted by `id`, mutably. Panics if the segment was erased.
    pub fn get_mut(&mut self, id: SegmentId) -> &mut MemorySegment {
        &mut self.node_mut(id).segment
    }

    /// Returns the handle of the segment immediately after `id`, or [`None`] at the end of the
    /// arena.
    pub fn next(&self, id: SegmentId) -> Option<SegmentId> {
        self.node(id).next
    }

    /// Returns the handle of the segment immediately before `id`, or [`None`] at the start of the
    /// arena.
    pub fn previous(&self, id: SegmentId) -> Option<SegmentId> {
        self.node(id).previous
    }

    /// Stores a node, recycling a vacant slot when one exists.
    fn claim_slot(&mut self, node: SegmentNode) -> SegmentId {
        match self.vacant.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                SegmentId(index)
            }
            None => {
                self.slots.push(Some(node));
                SegmentId(self.slots.len() - 1)
            }
        }
    }

    /// Splices a new segment immediately before the segment denoted by `id` and returns its
    /// handle.
    ///
    /// The caller is responsible for the address ranges: this method maintains the links, not the
    /// partition. It is only ever used while splitting, where the caller shrinks the segment at
    /// `id` to match.
    pub fn insert_before(&mut self, id: SegmentId, segment: MemorySegment) -> SegmentId {
        let previous = self.node(id).previous;
        let new_id = self.claim_slot(SegmentNode {
            segment,
            previous,
            next: Some(id),
        });
        self.node_mut(id).previous = Some(new_id);
        match previous {
            Some(previous_id) => self.node_mut(previous_id).next = Some(new_id),
            None => self.first = Some(new_id),
        }
        self.len += 1;
        debug_assert!(self.test_links(), "links should be consistent");
        new_id
    }

    /// Erases the segment denoted by `id` from the list and returns it.
    ///
    /// Panics if the segment was already erased. The segment must not be in the free-segment heap
    /// any more; releasing its heap slot first is the caller's responsibility.
    pub fn remove(&mut self, id: SegmentId) -> MemorySegment {
        let node = match self.slots[id.0].take() {
            Some(node) => node,
            None => panic!("segment {:?} was already erased", id),
        };
        match node.previous {
            Some(previous_id) => self.node_mut(previous_id).next = node.next,
            None => self.first = node.next,
        }
        match node.next {
            Some(next_id) => self.node_mut(next_id).previous = node.previous,
            None => self.last = node.previous,
        }
        self.vacant.push(id.0);
        self.len -= 1;
        debug_assert!(self.test_links(), "links should be consistent");
        node.segment
    }

    /// Iterates over the segments in address order.
    pub fn iter(&self) -> Segments<'_> {
        Segments {
            list: self,
            current: self.first,
        }
    }

    /// Tests if the segments partition `[1, memory_size]`: contiguous, sorted by address, no gaps
    /// and no overlaps.
    pub(crate) fn test_partition(&self) -> bool {
        let mut expected_left = 1;
        for (_, segment) in self.iter() {
            if segment.left != expected_left || segment.right < segment.left {
                return false;
            }
            expected_left = segment.right + 1;
        }
        expected_left == self.memory_size + 1
    }

    /// Tests if the links are consistent in both directions, including `first`, `last` and `len`.
    fn test_links(&self) -> bool {
        let mut count = 0;
        let mut previous = None;
        let mut current = self.first;
        while let Some(id) = current {
            let node = self.node(id);
            if node.previous != previous {
                return false;
            }
            count += 1;
            previous = current;
            current = node.next;
        }
        self.last == previous && count == self.len
    }
}

impl HeapContext<SegmentId> for SegmentList {
    /// The worst-fit order: larger segments first, ties broken towards the lower address.
    fn precedes(&self, first: &SegmentId, second: &SegmentId) -> bool {
        let first = self.get(*first);
        let second = self.get(*second);
        second.size() < first.size() || (first.size() == second.size() && first.left < second.left)
    }

    fn slot_changed(&mut self, element: &SegmentId, slot: Option<HeapSlot>) {
        self.get_mut(*element).heap_slot = slot;
    }
}

impl Display for SegmentList {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (_, segment) in self.iter() {
            write!(f, "{} -> ", segment)?;
        }
        write!(f, "NULL")
    }
}


/// An iterator over the segments of a [`SegmentList`], in address order.
#[derive(Debug)]
pub struct Segments<'a> {
    list: &'a SegmentList,
    current: Option<SegmentId>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = (SegmentId, &'a MemorySegment);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.list.node(id).next;
        Some((id, self.list.get(id)))
    }
}
