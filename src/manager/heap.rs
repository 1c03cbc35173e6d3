/// The position of an element within a [`TrackedHeap`].
pub type HeapSlot = usize;

/// Supplies a [`TrackedHeap`] with its element order, and receives a notification every time an
/// element's slot changes.
///
/// The two concerns live on one trait because both need access to whatever the elements point
/// into: a heap of handles cannot order two handles, nor record a handle's slot, without the store
/// that owns the referenced data. The store is therefore passed into every mutating heap
/// operation as the context.
pub trait HeapContext<T> {
    /// Tests if `first` must be ordered strictly above `second`.
    fn precedes(&self, first: &T, second: &T) -> bool;

    /// Called with an element's new slot whenever it moves, and with [`None`] when it is removed.
    ///
    /// This is how the owner of the referenced data keeps a cached copy of each element's slot
    /// accurate, which in turn is what makes O(log n) removal of an arbitrary element possible.
    fn slot_changed(&mut self, element: &T, slot: Option<HeapSlot>);
}


/// A binary heap over opaque elements that reports every slot change to a [`HeapContext`].
///
/// On top of the usual `push`/`top`/`pop` contract, the heap supports removing the element at any
/// occupied slot in O(log n): the element is swapped with the last one, and the vacated slot is
/// restored with at most one sift-up and one sift-down.
#[derive(Debug)]
pub struct TrackedHeap<T> {
    elements: Vec<T>,
}

impl<T> TrackedHeap<T> {
    /// Creates a new, empty heap.
    pub fn new() -> Self {
        Self { elements: Vec::new() }
    }

    /// Returns the number of elements in the heap.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Tests if the heap contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the highest-priority element without removing it, or [`None`] if the heap is
    /// empty.
    pub fn top(&self) -> Option<&T> {
        self.elements.first()
    }

    /// Returns the element at a specific slot, if it is occupied.
    pub fn get(&self, slot: HeapSlot) -> Option<&T> {
        self.elements.get(slot)
    }

    #[inline]
    fn parent(slot: HeapSlot) -> HeapSlot {
        (slot - 1) / 2
    }

    #[inline]
    fn left_child(&self, slot: HeapSlot) -> Option<HeapSlot> {
        let child = 2 * slot + 1;
        (child < self.elements.len()).then_some(child)
    }

    #[inline]
    fn right_child(&self, slot: HeapSlot) -> Option<HeapSlot> {
        let child = 2 * slot + 2;
        (child < self.elements.len()).then_some(child)
    }

    fn precedes_at(&self, ctx: &impl HeapContext<T>, first: HeapSlot, second: HeapSlot) -> bool {
        ctx.precedes(&self.elements[first], &self.elements[second])
    }

    /// Swaps the elements at two slots and notifies both of their new slots.
    fn swap_elements(&mut self, first: HeapSlot, second: HeapSlot, ctx: &mut impl HeapContext<T>) {
        self.elements.swap(first, second);
        ctx.slot_changed(&self.elements[first], Some(first));
        ctx.slot_changed(&self.elements[second], Some(second));
    }

    /// Moves the element at `slot` towards the root until its parent orders above it. Returns the
    /// element's final slot.
    fn sift_up(&mut self, mut slot: HeapSlot, ctx: &mut impl HeapContext<T>) -> HeapSlot {
        while slot > 0 {
            let parent = Self::parent(slot);
            if !self.precedes_at(ctx, slot, parent) {
                break;
            }
            self.swap_elements(slot, parent, ctx);
            slot = parent;
        }
        slot
    }

    /// Moves the element at `slot` towards the leaves, swapping it with its highest-priority
    /// child, until heap order is restored.
    fn sift_down(&mut self, mut slot: HeapSlot, ctx: &mut impl HeapContext<T>) {
        while let Some(left) = self.left_child(slot) {
            let swap_slot = match self.right_child(slot) {
                None => self.precedes_at(ctx, left, slot).then_some(left),
                Some(right) => {
                    if self.precedes_at(ctx, left, right) {
                        self.precedes_at(ctx, left, slot).then_some(left)
                    } else {
                        self.precedes_at(ctx, right, slot).then_some(right)
                    }
                }
            };
            match swap_slot {
                Some(child) => {
                    self.swap_elements(child, slot, ctx);
                    slot = child;
                }
                None => return,
            }
        }
    }

    /// Inserts an element and restores heap order. Returns the element's final slot.
    ///
    /// Every element whose slot changes during the operation, including the new one, is notified
    /// through the context.
    pub fn push(&mut self, element: T, ctx: &mut impl HeapContext<T>) -> HeapSlot {
        self.elements.push(element);
        let slot = self.elements.len() - 1;
        ctx.slot_changed(&self.elements[slot], Some(slot));
        self.sift_up(slot, ctx)
    }

    /// Removes the element at `slot`, which is not required to be the top.
    ///
    /// The removed element is notified with [`None`]. Panics if `slot` is not occupied.
    pub fn remove(&mut self, slot: HeapSlot, ctx: &mut impl HeapContext<T>) {
        assert!(slot < self.elements.len(), "slot {} is not occupied", slot);
        let last = self.elements.len() - 1;
        self.swap_elements(slot, last, ctx);
        // The pop cannot fail: `slot` was occupied, so the heap is non-empty.
        let removed = self.elements.pop().unwrap();
        ctx.slot_changed(&removed, None);
        // When the removed element was the last one, the vacated slot no longer exists and there
        // is nothing to restore.
        if slot < self.elements.len() {
            let slot = self.sift_up(slot, ctx);
            self.sift_down(slot, ctx);
        }
    }

    /// Removes the highest-priority element. Panics if the heap is empty.
    pub fn pop(&mut self, ctx: &mut impl HeapContext<T>) {
        self.remove(0, ctx)
    }
}
