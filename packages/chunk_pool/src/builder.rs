use std::alloc::{GlobalAlloc, System};
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{ChunkPool, DropPolicy};

/// Builder for creating an instance of [`ChunkPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`ChunkPool::new()`][1] obtains blocks from the
/// [system allocator][System] and may be dropped with chunks still allocated.
///
/// # Examples
///
/// ```
/// use std::alloc::System;
///
/// use chunk_pool::{ChunkPool, DropPolicy};
///
/// let pool = ChunkPool::<u64, 32>::builder()
///     .block_allocator(System)
///     .drop_policy(DropPolicy::MustNotReleaseLiveChunks)
///     .build();
/// ```
///
/// [1]: ChunkPool::new
#[must_use]
pub struct ChunkPoolBuilder<T, const N: usize, A = System> {
    allocator: A,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T, const N: usize, A> fmt::Debug for ChunkPoolBuilder<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("chunks_per_block", &N)
            .field("block_allocator", &format_args!("{}", type_name::<A>()))
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T, const N: usize> ChunkPoolBuilder<T, N> {
    pub(crate) fn new() -> Self {
        Self {
            allocator: System,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }
}

impl<T, const N: usize, A: GlobalAlloc> ChunkPoolBuilder<T, N, A> {
    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat chunks that
    /// are still allocated when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::{ChunkPool, DropPolicy};
    ///
    /// let pool = ChunkPool::<u32, 8>::builder()
    ///     .drop_policy(DropPolicy::MustNotReleaseLiveChunks)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Sets the allocator that the pool obtains its blocks from.
    ///
    /// The pool calls into this allocator once per block it grows by and once per block when
    /// it is dropped, never per chunk. Pools created via [`ChunkPool::rebind()`] receive a clone
    /// of the allocator.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::alloc::System;
    ///
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<u32, 8>::builder().block_allocator(System).build();
    /// ```
    pub fn block_allocator<B: GlobalAlloc>(self, allocator: B) -> ChunkPoolBuilder<T, N, B> {
        ChunkPoolBuilder {
            allocator,
            drop_policy: self.drop_policy,
            _item: PhantomData,
        }
    }

    /// Builds the pool with the specified configuration.
    ///
    /// This does not allocate any memory. The first block is acquired by the first call to
    /// [`ChunkPool::allocate()`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<u32, 8>::builder().build();
    ///
    /// assert_eq!(pool.block_count(), 0);
    /// ```
    #[must_use]
    pub fn build(self) -> ChunkPool<T, N, A> {
        ChunkPool::new_inner(self.allocator, self.drop_policy)
    }
}
