//! # The query stream
//!
//! A simulation input consists of the memory size, the number of queries, and one integer per
//! query: a positive value `v` requests the allocation of `v` cells, and a non-positive value `v`
//! requests the release of the block allocated by query `-v - 1` (a zero-based index into this
//! same stream). Parsing is done using the [`parse_simulation`] function.

use crate::exceptions::{InputException, InputResult};
use crate::reader::Reader;

/// A single request against the memory manager.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Query {
    /// Allocate a block of `size` consecutive cells.
    Allocation { size: usize },
    /// Release the block allocated by the query at `query_index`.
    ///
    /// The index is kept as an `i64` because the stream is allowed to reference a query that does
    /// not denote a live allocation; such a request is a no-op.
    Free { query_index: i64 },
}

/// A parsed simulation input.
#[derive(Debug)]
pub struct Simulation {
    /// The size of the arena. Cells are addressed `1..=memory_size`.
    pub memory_size: usize,
    pub queries: Vec<Query>,
}


/// Parses a whole simulation from the query stream.
pub fn parse_simulation(input: &str) -> InputResult<Simulation> {
    let mut reader = Reader::new(input);
    let (memory_size, span) = reader.read_integer("the memory size")?;
    if memory_size <= 0 {
        return Err(InputException::invalid_memory_size(span, memory_size));
    }
    let (query_count, span) = reader.read_integer("the query count")?;
    if query_count < 0 {
        return Err(InputException::invalid_query_count(span, query_count));
    }
    // The count is not trusted for pre-allocation: a huge value must fail through the read loop,
    // not through the allocator.
    let mut queries = Vec::new();
    for _ in 0..query_count {
        let (value, _) = reader.read_integer("a query")?;
        if value > 0 {
            queries.push(Query::Allocation { size: value as usize })
        } else {
            // `i64::MIN` has no negation; it degrades to an index that is never in range, which
            // the runner treats as a no-op like any other dangling reference.
            let query_index = value.checked_neg().map_or(i64::MAX, |negated| negated - 1);
            queries.push(Query::Free { query_index })
        }
    }
    Ok(Simulation {
        memory_size: memory_size as usize,
        queries,
    })
}
