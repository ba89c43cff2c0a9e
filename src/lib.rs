#![no_std]
#![warn(missing_docs)]

//! A double-ended sequence built from a linked chain of fixed-capacity ring
//! buffers.
//!
//! [`UnrolledList`] offers O(1) amortized pushes and pops at both ends, and
//! indexed access in O(n / chunk capacity), without ever reallocating or
//! moving the elements already stored. Each link of the chain is a
//! [`Chunk`](chunk::Chunk), which is usable on its own as a fixed-capacity
//! double-ended queue over any [`ContiguousStorage`](storage::ContiguousStorage).
//!
//! # Examples
//! ```
//! use unrolled::UnrolledList;
//!
//! let mut list = UnrolledList::<&str>::with_chunk_capacity(2);
//! list.push_back("b");
//! list.push_back("c");
//! list.push_front("a");
//!
//! assert_eq!(list.len(), 3);
//! assert_eq!(list.chunk_count(), 2);
//! assert_eq!(list.front(), Some(&"a"));
//! assert_eq!(list.back(), Some(&"c"));
//! assert_eq!(list[1], "b");
//! ```

extern crate alloc;

mod arena;
pub mod chunk;
pub mod list;
pub mod storage;

pub use crate::chunk::{Chunk, HeapChunk, SliceChunk};
pub use crate::list::{UnrolledList, DEFAULT_CHUNK_CAPACITY};

use core::fmt::{self, Display, Formatter};

/// The error type for operations that need to allocate a chunk of some
/// capacity, returned when that capacity is unusable or the allocation fails.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CapacityError;

impl Display for CapacityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("insufficient capacity")
    }
}

/// A specialized [`Result`](core::result::Result) type for operations that
/// may fail to allocate.
pub type Result<T> = core::result::Result<T, CapacityError>;
