use std::alloc::{GlobalAlloc, System};
use std::any::type_name;
#[cfg(debug_assertions)]
use std::collections::HashSet;
use std::ptr::{self, NonNull};
use std::{fmt, mem, thread};

use crate::{Block, ChunkPoolBuilder, DropPolicy, Error, Link, Result, Slot};

/// A pool of equally sized memory chunks, each able to hold one `T`.
///
/// The pool obtains memory from an underlying allocator `A` in blocks of `N` chunks and threads
/// the free chunks into a singly linked list stored inside the chunks themselves. Allocating a
/// chunk pops the head of that list and deallocating pushes the chunk back, so both are O(1)
/// pointer operations. Only when the list is empty does [`allocate()`][1] call into the
/// underlying allocator to acquire a new block.
///
/// Chunks are handed out as uninitialized storage. The pool never reads, writes or drops
/// anything stored in an allocated chunk. It is up to the caller to construct a value in the
/// chunk and to drop it (if needed) before giving the chunk back.
///
/// # Reuse order
///
/// The free list is last in, first out: the most recently deallocated chunk is the next one
/// handed out. A fresh block hands out its chunks in ascending address order.
///
/// # Resource usage
///
/// Memory is never returned to the underlying allocator while the pool is alive. The footprint
/// of the pool is its highest number of simultaneously allocated chunks, rounded up to whole
/// blocks. All blocks are released when the pool is dropped.
///
/// # Chunk size
///
/// A free chunk holds a pointer to the next free chunk, so [`chunk_size()`][2] is the size of
/// `T` padded up to at least the size and alignment of a pointer. For types at least as large
/// and as aligned as a pointer, the chunk size is exactly `size_of::<T>()`.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]). It is meant to be owned
/// and used by a single party at a time.
///
/// # Example
///
/// ```rust
/// use chunk_pool::ChunkPool;
///
/// let mut pool = ChunkPool::<u64, 16>::new();
///
/// let chunk = pool.allocate().unwrap();
///
/// // SAFETY: The chunk is valid for writes of one u64 and nobody else is using it.
/// unsafe { chunk.write(42) };
///
/// // SAFETY: We just initialized the value.
/// assert_eq!(unsafe { chunk.read() }, 42);
///
/// // SAFETY: The chunk came from this pool and we no longer use it.
/// unsafe { pool.deallocate(chunk) };
/// ```
///
/// [1]: Self::allocate
/// [2]: Self::chunk_size
pub struct ChunkPool<T, const N: usize, A: GlobalAlloc = System> {
    /// The next chunk to hand out. Each free chunk links to the next one and the last free chunk
    /// links to `None`. When this is `None`, the next allocation acquires a new block.
    free_head: Link<T>,

    /// Every block we have acquired, kept only so we can release them when the pool is dropped.
    blocks: Vec<Block<T, N>>,

    /// Number of chunks currently handed out.
    len: usize,

    drop_policy: DropPolicy,

    allocator: A,

    /// Chunks currently handed out, used to detect callers returning a chunk that is not theirs
    /// to return. Release builds trust the caller.
    #[cfg(debug_assertions)]
    live_chunks: HashSet<NonNull<Slot<T>>>,
}

impl<T, const N: usize> ChunkPool<T, N> {
    /// Creates a new [`ChunkPool`] that obtains blocks from the [system allocator][System].
    ///
    /// The pool starts empty and does not allocate any memory until the first chunk is
    /// requested.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::ChunkPool;
    ///
    /// let pool = ChunkPool::<String, 64>::new();
    ///
    /// assert_eq!(pool.capacity(), 0);
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`ChunkPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::{ChunkPool, DropPolicy};
    ///
    /// let pool = ChunkPool::<u32, 64>::builder()
    ///     .drop_policy(DropPolicy::MustNotReleaseLiveChunks)
    ///     .build();
    ///
    /// assert!(pool.is_empty());
    /// ```
    pub fn builder() -> ChunkPoolBuilder<T, N> {
        ChunkPoolBuilder::new()
    }
}

impl<T, const N: usize, A: GlobalAlloc> ChunkPool<T, N, A> {
    #[must_use]
    pub(crate) fn new_inner(allocator: A, drop_policy: DropPolicy) -> Self {
        const { assert!(N > 0, "ChunkPool must have at least one chunk per block") };

        Self {
            free_head: None,
            blocks: Vec::new(),
            len: 0,
            drop_policy,
            allocator,
            #[cfg(debug_assertions)]
            live_chunks: HashSet::new(),
        }
    }

    /// Hands out one chunk of uninitialized storage suitable for a `T`.
    ///
    /// The most recently deallocated chunk is returned if there is one. If no chunk is free, a
    /// new block of `N` chunks is acquired from the underlying allocator first.
    ///
    /// The returned pointer is valid for reads and writes of one `T` and properly aligned for
    /// it until it is passed to [`deallocate()`][1] or the pool is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if a new block was needed but the underlying allocator
    /// could not supply it, or [`Error::BlockTooLarge`] if `N` chunks do not fit in a single
    /// allocation. In both cases the pool is left unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u32, 4>::new();
    ///
    /// let first = pool.allocate().unwrap();
    /// assert_eq!(pool.block_count(), 1);
    /// assert_eq!(pool.len(), 1);
    ///
    /// // SAFETY: The chunk came from this pool and we never used it.
    /// unsafe { pool.deallocate(first) };
    ///
    /// // The chunk we just returned is the next one to be handed out.
    /// let second = pool.allocate().unwrap();
    /// assert_eq!(first, second);
    /// # unsafe { pool.deallocate(second) };
    /// ```
    ///
    /// [1]: Self::deallocate
    pub fn allocate(&mut self) -> Result<NonNull<T>> {
        let chunk = match self.free_head {
            Some(chunk) => chunk,
            None => self.grow()?,
        };

        // Pop the chunk off the free list.
        // SAFETY: The chunk is the head of the free list, so it is a free chunk of a live block.
        self.free_head = unsafe { Slot::read_link(chunk) };

        self.len = self
            .len
            .checked_add(1)
            .expect("every allocated chunk occupies memory, so the count cannot overflow");

        #[cfg(debug_assertions)]
        {
            let newly_live = self.live_chunks.insert(chunk);
            assert!(
                newly_live,
                "free list handed out chunk {chunk:?} of {} twice",
                type_name::<T>()
            );
        }

        Ok(Slot::value_ptr(chunk))
    }

    /// Hands out storage for `count` contiguous values of `T`.
    ///
    /// A pool only ever serves a single chunk per request, so `count` must be 1. This form
    /// exists for consumers that are written against a count-taking allocation interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCount`] if `count` is not 1, without touching the pool.
    /// Otherwise fails the same way as [`allocate()`][1].
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::{ChunkPool, Error};
    ///
    /// let mut pool = ChunkPool::<u32, 4>::new();
    ///
    /// assert!(matches!(
    ///     pool.allocate_n(2),
    ///     Err(Error::UnsupportedCount { requested: 2 })
    /// ));
    ///
    /// let chunk = pool.allocate_n(1).unwrap();
    /// # unsafe { pool.deallocate_n(chunk, 1) };
    /// ```
    ///
    /// [1]: Self::allocate
    pub fn allocate_n(&mut self, count: usize) -> Result<NonNull<T>> {
        if count != 1 {
            return Err(Error::UnsupportedCount { requested: count });
        }

        self.allocate()
    }

    /// Returns a chunk to the pool, making it the next chunk to be handed out.
    ///
    /// The pool does not drop any value stored in the chunk. Drop or move it out first if
    /// needed.
    ///
    /// # Safety
    ///
    /// * `chunk` must have been returned by [`allocate()`][1] or [`allocate_n()`][2] on this
    ///   same pool and must not have been deallocated since.
    /// * The caller must not access the chunk through any pointer after this call.
    ///
    /// Violating these requirements corrupts the free list. Debug builds detect a chunk that is
    /// not currently allocated from this pool and panic. Release builds do not check.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<String, 8>::new();
    ///
    /// let chunk = pool.allocate().unwrap();
    ///
    /// // SAFETY: The chunk is valid for writes and nobody else is using it.
    /// unsafe { chunk.write("hello".to_string()) };
    ///
    /// // SAFETY: The value was initialized above and is never used again.
    /// unsafe { chunk.drop_in_place() };
    ///
    /// // SAFETY: The chunk came from this pool and we no longer use it.
    /// unsafe { pool.deallocate(chunk) };
    ///
    /// assert!(pool.is_empty());
    /// ```
    ///
    /// [1]: Self::allocate
    /// [2]: Self::allocate_n
    pub unsafe fn deallocate(&mut self, chunk: NonNull<T>) {
        let chunk = Slot::from_value_ptr(chunk);

        #[cfg(debug_assertions)]
        {
            let was_live = self.live_chunks.remove(&chunk);
            assert!(
                was_live,
                "deallocate({chunk:?}) was given a chunk that is not currently allocated from this pool of {}",
                type_name::<T>()
            );
        }

        // Push the chunk onto the free list.
        // SAFETY: The caller guarantees the chunk belongs to one of our live blocks and is no
        // longer used, so its storage is ours to reuse as a link.
        unsafe {
            Slot::write_link(chunk, self.free_head);
        }

        self.free_head = Some(chunk);

        self.len = self
            .len
            .checked_sub(1)
            .expect("deallocated more chunks than were allocated");
    }

    /// Returns `count` contiguous chunks to the pool.
    ///
    /// The counterpart to [`allocate_n()`][1], with the same single-chunk restriction.
    ///
    /// # Safety
    ///
    /// Same as [`deallocate()`][2].
    ///
    /// # Panics
    ///
    /// Panics if `count` is not 1.
    ///
    /// [1]: Self::allocate_n
    /// [2]: Self::deallocate
    pub unsafe fn deallocate_n(&mut self, chunk: NonNull<T>, count: usize) {
        assert!(
            count == 1,
            "deallocate_n({count}) called on a pool of {} that only serves single chunks",
            type_name::<T>()
        );

        // SAFETY: Forwarding the caller's guarantees.
        unsafe {
            self.deallocate(chunk);
        }
    }

    /// Creates a new, empty pool for a different element type with the same number of chunks
    /// per block, the same drop policy and a clone of the underlying allocator.
    ///
    /// The new pool is fully independent: it shares no blocks or free chunks with this one and
    /// chunks from one can never be returned to the other. This lets a container that allocates
    /// some internal node type derive a compatible pool from the pool it was given.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::ChunkPool;
    ///
    /// struct Node {
    ///     value: u32,
    ///     next: Option<std::ptr::NonNull<Node>>,
    /// }
    ///
    /// let values = ChunkPool::<u32, 32>::new();
    /// let nodes = values.rebind::<Node>();
    ///
    /// assert_eq!(nodes.chunks_per_block(), 32);
    /// assert!(values != nodes);
    /// ```
    #[must_use]
    pub fn rebind<U>(&self) -> ChunkPool<U, N, A>
    where
        A: Clone,
    {
        ChunkPool::new_inner(self.allocator.clone(), self.drop_policy)
    }

    /// The size of one chunk in bytes. This is also the distance between the addresses of
    /// neighboring chunks in a block.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        size_of::<Slot<T>>()
    }

    /// The number of chunks the pool acquires at a time.
    #[must_use]
    pub fn chunks_per_block(&self) -> usize {
        N
    }

    /// The size in bytes of each block requested from the underlying allocator.
    ///
    /// # Panics
    ///
    /// Panics if the block size does not fit in `usize`. Such a pool could never acquire a
    /// block.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.chunk_size()
            .checked_mul(N)
            .expect("a block that does not fit in the address space can never be allocated")
    }

    /// The number of blocks acquired from the underlying allocator so far.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The number of chunks the pool holds across all of its blocks, whether free or allocated.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chunk_pool::ChunkPool;
    ///
    /// let mut pool = ChunkPool::<u64, 10>::new();
    /// assert_eq!(pool.capacity(), 0);
    ///
    /// let chunk = pool.allocate().unwrap();
    /// assert_eq!(pool.capacity(), 10);
    /// # unsafe { pool.deallocate(chunk) };
    /// ```
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks.len()
            .checked_mul(N)
            .expect("overflow here would mean the pool holds more chunks than virtual memory can fit")
    }

    /// The number of chunks currently allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no chunks are currently allocated.
    ///
    /// An empty pool may still be holding blocks of free chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the next [`allocate()`][1] will be served from a free chunk rather than by
    /// acquiring a new block.
    ///
    /// [1]: Self::allocate
    #[must_use]
    pub fn has_free_chunk(&self) -> bool {
        self.free_head.is_some()
    }

    /// The allocator that blocks are obtained from.
    #[must_use]
    pub fn block_allocator(&self) -> &A {
        &self.allocator
    }

    /// Acquires a new block and returns its first chunk, which becomes the free-list head.
    ///
    /// On failure the pool is unchanged.
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    fn grow(&mut self) -> Result<NonNull<Slot<T>>> {
        debug_assert!(self.free_head.is_none());

        // Make room in the registry first so that, once we have the block, nothing can fail.
        self.blocks
            .try_reserve(1)
            .map_err(|_reserve_error| Error::OutOfMemory {
                bytes: size_of::<Block<T, N>>(),
            })?;

        let block = Block::acquire(&self.allocator)?;
        let first_chunk = block.first_chunk();

        self.blocks.push(block);
        self.free_head = Some(first_chunk);

        Ok(first_chunk)
    }

    #[cfg(test)]
    fn free_chunks(&self) -> Vec<NonNull<Slot<T>>> {
        let mut chunks = Vec::new();
        let mut current = self.free_head;

        while let Some(chunk) = current {
            chunks.push(chunk);
            // SAFETY: Every chunk reachable from the free-list head is free.
            current = unsafe { Slot::read_link(chunk) };
        }

        chunks
    }
}

impl<T, const N: usize> Default for ChunkPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, A: GlobalAlloc> fmt::Debug for ChunkPool<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("chunks_per_block", &N)
            .field("chunk_size", &self.chunk_size())
            .field("block_count", &self.blocks.len())
            .field("len", &self.len)
            .field("has_free_chunk", &self.has_free_chunk())
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

/// Two pools are equal only if they are the same pool.
///
/// Chunks can only ever be returned to the pool they came from, so no two distinct pools are
/// interchangeable, regardless of their element type or configuration. Pools with a different
/// number of chunks per block are always unequal.
impl<T, U, const N: usize, const M: usize, A, B> PartialEq<ChunkPool<U, M, B>>
    for ChunkPool<T, N, A>
where
    A: GlobalAlloc,
    B: GlobalAlloc,
{
    fn eq(&self, other: &ChunkPool<U, M, B>) -> bool {
        N == M && ptr::addr_eq(ptr::from_ref(self), ptr::from_ref(other))
    }
}

impl<T, const N: usize, A: GlobalAlloc> Eq for ChunkPool<T, N, A> {}

impl<T, const N: usize, A: GlobalAlloc> Drop for ChunkPool<T, N, A> {
    fn drop(&mut self) {
        for block in mem::take(&mut self.blocks) {
            // SAFETY: Every block in the registry was acquired from our allocator and is
            // released exactly once, here.
            unsafe {
                block.release(&self.allocator);
            }
        }

        self.free_head = None;

        // We check at the end so the memory is released first. If we are already panicking, we
        // do not want to panic again because that would obscure the original panic.
        if self.drop_policy == DropPolicy::MustNotReleaseLiveChunks && !thread::panicking() {
            assert!(
                self.is_empty(),
                "dropped a pool of {} with {} chunks still allocated with a policy that says it must be empty when dropped",
                type_name::<T>(),
                self.len
            );
        }
    }
}

// SAFETY: The raw pointers only refer to memory owned by the pool, so nothing ties the pool
// to the thread that created it. Values of T may live in its chunks, so T must be Send, as must
// the allocator that the blocks are released to.
unsafe impl<T: Send, const N: usize, A: GlobalAlloc + Send> Send for ChunkPool<T, N, A> {}
