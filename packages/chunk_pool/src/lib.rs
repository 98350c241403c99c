#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-size chunk allocator that hands out and takes back equally sized memory slots without
//! calling into a general-purpose allocator for every request.
//!
//! [`ChunkPool<T, N>`][ChunkPool] serves chunks able to hold one `T`. It obtains memory in blocks
//! of `N` chunks and threads the free chunks into a singly linked list stored inside the chunks
//! themselves, so the pool needs no bookkeeping beyond the head of that list:
//!
//! * [`allocate()`][ChunkPool::allocate] pops the head of the free list. Only when the list is
//!   empty does it acquire a new block from the underlying allocator.
//! * [`deallocate()`][ChunkPool::deallocate] pushes the chunk back onto the head of the list,
//!   so the most recently returned chunk is the next one handed out.
//!
//! Both are O(1) pointer operations, except for the occasional allocation that pays for
//! acquiring a block.
//!
//! # Key features
//!
//! - **Lazy growth**: creating a pool allocates nothing; the first request acquires the first
//!   block.
//! - **No per-chunk bookkeeping**: free chunks store the link to the next free chunk in their
//!   own storage.
//! - **Pluggable block source**: blocks come from any [`GlobalAlloc`][std::alloc::GlobalAlloc],
//!   the [system allocator][std::alloc::System] by default.
//! - **Rebinding**: [`rebind()`][ChunkPool::rebind] derives an independent pool for another
//!   element type with the same block size, for containers that allocate internal node types.
//! - **Identity equality**: two pools compare equal only if they are the same pool, because
//!   chunks can only ever be returned to the pool they came from.
//!
//! # Limitations
//!
//! - Each request serves exactly one chunk. [`allocate_n()`][ChunkPool::allocate_n] rejects any
//!   other count.
//! - Memory is only returned to the underlying allocator when the pool is dropped. The pool's
//!   footprint is its peak number of simultaneously allocated chunks, rounded up to blocks.
//! - The pool is not thread-safe. It can be moved between threads but not shared.
//! - Returning a chunk twice, or returning a chunk to a pool it did not come from, is undefined
//!   behavior. Debug builds detect both and panic.
//!
//! # Example
//!
//! ```rust
//! use chunk_pool::ChunkPool;
//!
//! let mut pool = ChunkPool::<u64, 10>::new();
//!
//! let a = pool.allocate().unwrap();
//! let b = pool.allocate().unwrap();
//!
//! // A fresh block hands out its chunks in ascending address order.
//! assert_eq!(b.as_ptr().addr() - a.as_ptr().addr(), pool.chunk_size());
//!
//! // SAFETY: Both chunks are valid for writes of one u64 and unused by anyone else.
//! unsafe {
//!     a.write(1);
//!     b.write(2);
//! }
//!
//! // SAFETY: The chunk came from this pool and is no longer used.
//! unsafe { pool.deallocate(a) };
//!
//! // The chunk we returned last is handed out first.
//! let c = pool.allocate().unwrap();
//! assert_eq!(a, c);
//! # unsafe { pool.deallocate(b) };
//! # unsafe { pool.deallocate(c) };
//! ```

mod block;
mod builder;
mod drop_policy;
mod error;
mod pool;
mod slot;

pub(crate) use block::*;
pub use builder::*;
pub use drop_policy::*;
pub use error::Error;
pub(crate) use error::Result;
pub use pool::ChunkPool;
pub(crate) use slot::*;
