//! # The query runner
//!
//! The runner replays a parsed query sequence against one [`MemoryManager`] in a single pass,
//! and resolves free queries to the handles produced by earlier allocations.

use std::fmt;
use std::fmt::{Display, Formatter};

use crate::manager::MemoryManager;
use crate::manager::segments::SegmentId;
use crate::queries::Query;

/// The outcome of a single allocation query.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AllocationResponse {
    /// The block was placed, starting at `position`.
    Success { position: usize },
    /// No free segment was large enough.
    Failure,
}

impl Display for AllocationResponse {
    /// Formats the response the way the output stream expects it: the starting address on
    /// success, `-1` on failure.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Success { position } => write!(f, "{}", position),
            Self::Failure => write!(f, "-1"),
        }
    }
}


/// Replays `queries`, in order, against a fresh manager for an arena of `memory_size` cells.
///
/// Returns one response per allocation query, in input order; free queries produce no response.
///
/// The runner records the handle each query produced: an allocation records its segment handle
/// (or nothing, when it failed), and a free query records nothing. A free query *consumes* the
/// handle recorded at the index it references, so releasing the same index twice, an index whose
/// allocation failed, an index that was itself a free query, or an index that is out of range, is
/// a silent no-op.
pub fn run_queries(memory_size: usize, queries: &[Query]) -> Vec<AllocationResponse> {
    let mut manager = MemoryManager::new(memory_size);
    let mut responses = Vec::new();
    let mut recorded: Vec<Option<SegmentId>> = Vec::with_capacity(queries.len());
    for query in queries {
        match *query {
            Query::Allocation { size } => match manager.allocate(size) {
                Some((position, id)) => {
                    recorded.push(Some(id));
                    responses.push(AllocationResponse::Success { position });
                }
                None => {
                    recorded.push(None);
                    responses.push(AllocationResponse::Failure);
                }
            },
            Query::Free { query_index } => {
                let handle = usize::try_from(query_index)
                    .ok()
                    .and_then(|index| recorded.get_mut(index))
                    .and_then(|handle| handle.take());
                if let Some(id) = handle {
                    manager.free(id);
                }
                recorded.push(None);
            }
        }
    }
    responses
}
