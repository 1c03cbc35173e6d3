//! This module is responsible for running all tests.

#![cfg(test)]

use std::collections::HashMap;

use crate::manager::MemoryManager;
use crate::manager::heap::{HeapContext, HeapSlot, TrackedHeap};
use crate::manager::segments::{MemorySegment, SegmentId, SegmentList};
use crate::queries::{Query, parse_simulation};
use crate::runner::{AllocationResponse, run_queries};


/// Orders values largest-first and records the latest notified slot for each value.
#[derive(Default)]
struct ValueContext {
    slots: HashMap<u32, Option<HeapSlot>>,
}

impl HeapContext<u32> for ValueContext {
    fn precedes(&self, first: &u32, second: &u32) -> bool {
        first > second
    }

    fn slot_changed(&mut self, element: &u32, slot: Option<HeapSlot>) {
        self.slots.insert(*element, slot);
    }
}

/// Pops every element off the heap, largest first.
fn drain(heap: &mut TrackedHeap<u32>, ctx: &mut ValueContext) -> Vec<u32> {
    let mut popped = Vec::new();
    while let Some(&top) = heap.top() {
        popped.push(top);
        heap.pop(ctx);
    }
    popped
}

/// Asserts that every occupied slot's element has that slot cached in the context.
fn assert_slots_cached(heap: &TrackedHeap<u32>, ctx: &ValueContext) {
    for slot in 0..heap.len() {
        let element = heap.get(slot).unwrap();
        assert_eq!(ctx.slots[element], Some(slot), "element {} has a stale cached slot", element);
    }
}

#[test]
fn heap_orders_elements_largest_first() {
    let mut ctx = ValueContext::default();
    let mut heap = TrackedHeap::new();
    for value in [3, 1, 4, 15, 9, 2, 6] {
        heap.push(value, &mut ctx);
    }
    assert_eq!(heap.len(), 7);
    assert_eq!(drain(&mut heap, &mut ctx), vec![15, 9, 6, 4, 3, 2, 1]);
    assert!(heap.is_empty());
}

#[test]
fn heap_notifies_cached_slots() {
    let mut ctx = ValueContext::default();
    let mut heap = TrackedHeap::new();
    for value in [10, 20, 5, 30] {
        let slot = heap.push(value, &mut ctx);
        assert_eq!(ctx.slots[&value], Some(slot));
    }
    assert_slots_cached(&heap, &ctx);
}

#[test]
fn heap_removes_arbitrary_slots() {
    let mut ctx = ValueContext::default();
    let mut heap = TrackedHeap::new();
    for value in [8, 3, 10, 1, 6] {
        heap.push(value, &mut ctx);
    }
    let slot = ctx.slots[&8].unwrap();
    heap.remove(slot, &mut ctx);
    assert_eq!(ctx.slots[&8], None);
    assert_slots_cached(&heap, &ctx);
    assert_eq!(drain(&mut heap, &mut ctx), vec![10, 6, 3, 1]);
}

#[test]
fn heap_removes_the_last_slot() {
    let mut ctx = ValueContext::default();
    let mut heap = TrackedHeap::new();
    for value in [5, 4, 3] {
        heap.push(value, &mut ctx);
    }
    heap.remove(2, &mut ctx);
    assert_eq!(ctx.slots[&3], None);
    assert_eq!(drain(&mut heap, &mut ctx), vec![5, 4]);
}

#[test]
#[should_panic(expected = "is not occupied")]
fn heap_rejects_unoccupied_slots() {
    let mut ctx = ValueContext::default();
    let mut heap = TrackedHeap::new();
    heap.push(1, &mut ctx);
    heap.remove(3, &mut ctx);
}


#[test]
fn segment_size_is_inclusive() {
    assert_eq!(MemorySegment::new(4, 7).size(), 4);
    assert_eq!(MemorySegment::new(2, 2).size(), 1);
}

#[test]
fn segments_unite_to_the_covering_range() {
    let first = MemorySegment::new(4, 7);
    let second = MemorySegment::new(8, 10);
    assert_eq!(first.unite(&second), MemorySegment::new(4, 10));
    assert_eq!(second.unite(&first), MemorySegment::new(4, 10));
}

#[test]
fn segment_list_splices_and_erases() {
    let mut list = SegmentList::new(10);
    let arena = list.first().unwrap();
    let head = list.insert_before(arena, MemorySegment::new(1, 3));
    list.get_mut(arena).left = 4;
    assert_eq!(list.len(), 2);
    assert!(list.test_partition());
    assert_eq!(list.next(head), Some(arena));
    assert_eq!(list.previous(arena), Some(head));
    assert_eq!(list.previous(head), None);
    assert_eq!(list.next(arena), None);
    list.remove(head);
    list.get_mut(arena).left = 1;
    assert_eq!(list.len(), 1);
    assert_eq!(list.first(), Some(arena));
    assert_eq!(list.previous(arena), None);
    assert!(list.test_partition());
}

#[test]
fn segment_handles_survive_unrelated_splices() {
    let mut list = SegmentList::new(10);
    let tail = list.first().unwrap();
    let head = list.insert_before(tail, MemorySegment::new(1, 3));
    list.get_mut(tail).left = 4;
    let middle = list.insert_before(tail, MemorySegment::new(4, 6));
    list.get_mut(tail).left = 7;
    assert_eq!(*list.get(tail), MemorySegment::new(7, 10));
    list.remove(middle);
    list.get_mut(head).right = 6;
    assert_eq!(*list.get(tail), MemorySegment::new(7, 10));
    assert_eq!(list.previous(tail), Some(head));
    assert!(list.test_partition());
}

#[test]
#[should_panic(expected = "erased")]
fn segment_list_rejects_stale_handles() {
    let mut list = SegmentList::new(10);
    let arena = list.first().unwrap();
    list.remove(arena);
    list.get(arena);
}


/// Returns `(left, right, is_free)` for every segment, in address order.
fn layout(manager: &MemoryManager) -> Vec<(usize, usize, bool)> {
    manager.segments()
        .iter()
        .map(|(_, segment)| (segment.left, segment.right, segment.is_free()))
        .collect()
}

fn free_size(manager: &MemoryManager) -> usize {
    manager.segments()
        .iter()
        .filter(|(_, segment)| segment.is_free())
        .map(|(_, segment)| segment.size())
        .sum()
}

fn used_size(manager: &MemoryManager) -> usize {
    manager.segments()
        .iter()
        .filter(|(_, segment)| !segment.is_free())
        .map(|(_, segment)| segment.size())
        .sum()
}

#[test]
fn allocation_splits_the_largest_segment() {
    let mut manager = MemoryManager::new(10);
    let (position, _) = manager.allocate(3).unwrap();
    assert_eq!(position, 1);
    let (position, _) = manager.allocate(4).unwrap();
    assert_eq!(position, 4);
    assert_eq!(layout(&manager), vec![(1, 3, false), (4, 7, false), (8, 10, true)]);
}

#[test]
fn exact_fit_consumes_the_segment_in_place() {
    let mut manager = MemoryManager::new(10);
    let (position, id) = manager.allocate(10).unwrap();
    assert_eq!(position, 1);
    assert_eq!(layout(&manager), vec![(1, 10, false)]);
    manager.free(id);
    assert_eq!(layout(&manager), vec![(1, 10, true)]);
}

#[test]
fn allocation_fails_on_capacity_exhaustion() {
    let mut manager = MemoryManager::new(5);
    assert_eq!(manager.allocate(6), None);
    assert_eq!(layout(&manager), vec![(1, 5, true)]);
    assert!(manager.allocate(5).is_some());
    assert_eq!(manager.allocate(1), None);
}

#[test]
fn equal_sizes_break_towards_the_lowest_address() {
    let mut manager = MemoryManager::new(10);
    let (_, first) = manager.allocate(3).unwrap();
    manager.allocate(4).unwrap();
    manager.free(first);
    // [1, 3] and [8, 10] are both free and of size 3; worst-fit must pick the lower address.
    let (position, _) = manager.allocate(2).unwrap();
    assert_eq!(position, 1);
}

#[test]
fn freeing_coalesces_with_both_neighbors() {
    let mut manager = MemoryManager::new(10);
    let (_, first) = manager.allocate(3).unwrap();
    let (_, second) = manager.allocate(3).unwrap();
    let (_, third) = manager.allocate(3).unwrap();
    assert_eq!(layout(&manager), vec![(1, 3, false), (4, 6, false), (7, 9, false), (10, 10, true)]);
    manager.free(first);
    manager.free(third);
    assert_eq!(layout(&manager), vec![(1, 3, true), (4, 6, false), (7, 10, true)]);
    manager.free(second);
    assert_eq!(layout(&manager), vec![(1, 10, true)]);
}

#[test]
fn allocate_free_round_trip_restores_the_arena() {
    let mut manager = MemoryManager::new(100);
    let (_, id) = manager.allocate(17).unwrap();
    manager.free(id);
    assert_eq!(layout(&manager), vec![(1, 100, true)]);
}

#[test]
#[should_panic(expected = "already free")]
fn freeing_a_free_segment_fails_loudly() {
    let mut manager = MemoryManager::new(10);
    let (_, id) = manager.allocate(4).unwrap();
    manager.free(id);
    manager.free(id);
}

#[test]
fn invariants_hold_across_a_mixed_workload() {
    const MEMORY_SIZE: usize = 20;
    let mut manager = MemoryManager::new(MEMORY_SIZE);
    let mut handles: Vec<Option<SegmentId>> = Vec::new();
    for &query in &[5i64, 5, 5, -2, 3, -1, -3, 10, 2, -5] {
        if query > 0 {
            let handle = manager.allocate(query as usize).map(|(_, id)| id);
            handles.push(handle);
        } else {
            let index = (-query - 1) as usize;
            if let Some(id) = handles.get_mut(index).and_then(|handle| handle.take()) {
                manager.free(id);
            }
            handles.push(None);
        }
        assert!(manager.test_consistency(), "the ledger and the heap should agree");
        assert!(manager.test_no_adjacent_free(), "released segments should coalesce");
        assert_eq!(free_size(&manager) + used_size(&manager), MEMORY_SIZE);
    }
}

#[test]
fn ledger_dump_shows_tags_and_heap_slots() {
    assert_eq!(MemorySegment::new(1, 3).to_string(), "[1, used, 3]");
    let mut manager = MemoryManager::new(4);
    assert_eq!(manager.segments().to_string(), "[1, free{0}, 4] -> NULL");
    manager.allocate(2).unwrap();
    assert_eq!(manager.segments().to_string(), "[1, used, 2] -> [3, free{0}, 4] -> NULL");
}


#[test]
fn runner_emits_one_response_per_allocation() {
    let queries = [
        Query::Allocation { size: 3 },
        Query::Allocation { size: 4 },
        Query::Free { query_index: 0 },
        Query::Allocation { size: 2 },
    ];
    assert_eq!(run_queries(10, &queries), vec![
        AllocationResponse::Success { position: 1 },
        AllocationResponse::Success { position: 4 },
        AllocationResponse::Success { position: 1 },
    ]);
}

#[test]
fn runner_ignores_free_of_a_failed_allocation() {
    let queries = [
        Query::Allocation { size: 6 },
        Query::Free { query_index: 0 },
        Query::Allocation { size: 5 },
    ];
    assert_eq!(run_queries(5, &queries), vec![
        AllocationResponse::Failure,
        AllocationResponse::Success { position: 1 },
    ]);
}

#[test]
fn runner_ignores_double_free() {
    let queries = [
        Query::Allocation { size: 4 },
        Query::Allocation { size: 4 },
        Query::Free { query_index: 0 },
        Query::Allocation { size: 4 },
        // The handle recorded at index 0 was consumed by the first free; this one is a no-op. It
        // must not release the block the previous query placed at the same address.
        Query::Free { query_index: 0 },
        Query::Allocation { size: 4 },
    ];
    assert_eq!(run_queries(10, &queries), vec![
        AllocationResponse::Success { position: 1 },
        AllocationResponse::Success { position: 5 },
        AllocationResponse::Success { position: 1 },
        AllocationResponse::Failure,
    ]);
}

#[test]
fn runner_ignores_out_of_range_free_indices() {
    let queries = [
        Query::Free { query_index: -1 },
        Query::Free { query_index: 2 },
        Query::Allocation { size: 2 },
    ];
    assert_eq!(run_queries(10, &queries), vec![
        AllocationResponse::Success { position: 1 },
    ]);
}

#[test]
fn runner_ignores_free_of_a_free_query() {
    let queries = [
        Query::Allocation { size: 3 },
        Query::Free { query_index: 0 },
        Query::Free { query_index: 1 },
        Query::Allocation { size: 3 },
    ];
    assert_eq!(run_queries(10, &queries), vec![
        AllocationResponse::Success { position: 1 },
        AllocationResponse::Success { position: 1 },
    ]);
}


#[test]
fn parser_reads_the_query_stream() {
    let simulation = parse_simulation("6\n8\n2 3 -1 3 3 -5 2 2\n").unwrap();
    assert_eq!(simulation.memory_size, 6);
    assert_eq!(simulation.queries, vec![
        Query::Allocation { size: 2 },
        Query::Allocation { size: 3 },
        Query::Free { query_index: 0 },
        Query::Allocation { size: 3 },
        Query::Allocation { size: 3 },
        Query::Free { query_index: 4 },
        Query::Allocation { size: 2 },
        Query::Allocation { size: 2 },
    ]);
}

#[test]
fn parser_encodes_free_indices() {
    let simulation = parse_simulation("10 2 0 -3").unwrap();
    assert_eq!(simulation.queries, vec![
        Query::Free { query_index: -1 },
        Query::Free { query_index: 2 },
    ]);
}

#[test]
fn parser_encodes_the_most_negative_free_index() {
    let simulation = parse_simulation("4 1 -9223372036854775808").unwrap();
    assert_eq!(simulation.queries, vec![Query::Free { query_index: i64::MAX }]);
    // The index is out of range for any stream, so replaying it is a no-op.
    assert_eq!(run_queries(simulation.memory_size, &simulation.queries), vec![]);
}

#[test]
fn parser_rejects_non_integers() {
    assert!(parse_simulation("ten 0").is_err());
    assert!(parse_simulation("10 1 x").is_err());
}

#[test]
fn parser_rejects_truncated_input() {
    assert!(parse_simulation("").is_err());
    assert!(parse_simulation("10").is_err());
    assert!(parse_simulation("10 3 1 2").is_err());
    // A huge declared count is just a truncated stream; it must fail like one.
    assert!(parse_simulation("1 9223372036854775807").is_err());
}

#[test]
fn parser_rejects_non_positive_memory_sizes() {
    assert!(parse_simulation("0 1 1").is_err());
    assert!(parse_simulation("-4 0").is_err());
}

#[test]
fn parser_rejects_out_of_range_integers() {
    assert!(parse_simulation("99999999999999999999 0").is_err());
}


/// Runs a whole simulation and renders the responses one per line, the way `main` does.
fn simulate(input: &str) -> Vec<String> {
    let simulation = parse_simulation(input).expect("input should parse");
    run_queries(simulation.memory_size, &simulation.queries)
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn simulation_matches_the_reference_scenario() {
    assert_eq!(simulate("10\n4\n3 4 -1 2\n"), ["1", "4", "1"]);
}

#[test]
fn simulation_reports_failures_as_minus_one() {
    assert_eq!(simulate("5\n1\n6\n"), ["-1"]);
}

#[test]
fn simulation_reuses_coalesced_memory() {
    assert_eq!(
        simulate("6\n8\n2 3 -1 3 3 -5 2 2\n"),
        ["1", "3", "-1", "-1", "1", "-1"],
    );
}
