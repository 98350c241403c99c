use std::alloc::{GlobalAlloc, Layout};
use std::ptr::NonNull;

use crate::{Error, Result, Slot};

/// One contiguous extent of `N` chunks obtained from the underlying allocator in a single call.
///
/// The pool only remembers its blocks so it can hand them back to the allocator when the pool
/// itself is dropped. Handing out and taking back chunks goes exclusively through the free list.
#[derive(Debug)]
pub(crate) struct Block<T, const N: usize> {
    first_chunk: NonNull<Slot<T>>,
}

impl<T, const N: usize> Block<T, N> {
    pub(crate) fn layout() -> Result<Layout> {
        const { assert!(N > 0, "a block must have at least one chunk") };

        Layout::array::<Slot<T>>(N).map_err(|source| Error::BlockTooLarge {
            chunks: N,
            chunk_size: size_of::<Slot<T>>(),
            source,
        })
    }

    /// Obtains a new block from `allocator` and threads all of its chunks into a free list in
    /// ascending address order, terminated by `None`.
    ///
    /// On failure, nothing has been allocated.
    pub(crate) fn acquire<A: GlobalAlloc>(allocator: &A) -> Result<Self> {
        let layout = Self::layout()?;

        // SAFETY: The layout is not zero-sized because `N > 0` and a slot is at least as large
        // as a link.
        let first_chunk = NonNull::new(unsafe { allocator.alloc(layout) }.cast::<Slot<T>>())
            .ok_or(Error::OutOfMemory {
                bytes: layout.size(),
            })?;

        let mut chunk = first_chunk;

        for _ in 1..N {
            // SAFETY: We take at most N - 1 steps from the first chunk, so we stay in the block.
            let next = unsafe { chunk.add(1) };

            // SAFETY: The chunk is inside the block we just allocated and nobody else knows it.
            unsafe {
                Slot::write_link(chunk, Some(next));
            }

            chunk = next;
        }

        // SAFETY: This is the last chunk of the block we just allocated.
        unsafe {
            Slot::write_link(chunk, None);
        }

        Ok(Self { first_chunk })
    }

    #[must_use]
    pub(crate) fn first_chunk(&self) -> NonNull<Slot<T>> {
        self.first_chunk
    }

    /// Hands the block back to the allocator it came from.
    ///
    /// # Safety
    ///
    /// `allocator` must be the allocator the block was acquired from. Every pointer into the
    /// block is dangling afterwards.
    pub(crate) unsafe fn release<A: GlobalAlloc>(self, allocator: &A) {
        let layout = Self::layout().expect("layout was calculable when the block was acquired");

        // SAFETY: The caller guarantees the allocator matches and the layout is the same one we
        // used for the allocation.
        unsafe {
            allocator.dealloc(self.first_chunk.as_ptr().cast(), layout);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::alloc::System;
    use std::ptr;

    use super::*;

    struct NullAllocator;

    // SAFETY: Never hands out memory, so there is nothing to get wrong.
    unsafe impl GlobalAlloc for NullAllocator {
        unsafe fn alloc(&self, _layout: Layout) -> *mut u8 {
            ptr::null_mut()
        }

        unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {
            unreachable!("nothing was ever allocated");
        }
    }

    fn collect_chain<T>(first: NonNull<Slot<T>>) -> Vec<NonNull<Slot<T>>> {
        let mut chain = Vec::new();
        let mut current = Some(first);

        while let Some(chunk) = current {
            chain.push(chunk);
            // SAFETY: Every chunk in a freshly acquired block is free.
            current = unsafe { Slot::read_link(chunk) };
        }

        chain
    }

    #[test]
    fn chunks_are_threaded_in_address_order() {
        let block = Block::<u64, 5>::acquire(&System).unwrap();

        let chain = collect_chain(block.first_chunk());

        assert_eq!(chain.len(), 5);

        for pair in chain.windows(2) {
            let step = pair[1].as_ptr().addr() - pair[0].as_ptr().addr();
            assert_eq!(step, size_of::<Slot<u64>>());
        }

        // SAFETY: Acquired from `System` just above.
        unsafe {
            block.release(&System);
        }
    }

    #[test]
    fn single_chunk_block_is_terminated() {
        let block = Block::<u32, 1>::acquire(&System).unwrap();

        // SAFETY: The only chunk of a freshly acquired block is free.
        assert_eq!(unsafe { Slot::read_link(block.first_chunk()) }, None);

        // SAFETY: Acquired from `System` just above.
        unsafe {
            block.release(&System);
        }
    }

    #[test]
    fn layout_covers_all_chunks() {
        let layout = Block::<[u8; 24], 7>::layout().unwrap();

        assert_eq!(layout.size(), 7 * size_of::<Slot<[u8; 24]>>());
        assert_eq!(layout.align(), align_of::<Slot<[u8; 24]>>());
    }

    #[test]
    fn allocation_failure_is_out_of_memory() {
        let result = Block::<u64, 3>::acquire(&NullAllocator);

        assert!(matches!(
            result,
            Err(Error::OutOfMemory { bytes }) if bytes == 3 * size_of::<Slot<u64>>()
        ));
    }

    #[test]
    fn oversized_block_is_rejected() {
        let result = Block::<[u8; 1024], { usize::MAX / 1024 }>::layout();

        assert!(matches!(result, Err(Error::BlockTooLarge { chunk_size: 1024, .. })));
    }
}
