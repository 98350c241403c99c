use std::alloc::LayoutError;

use thiserror::Error;

/// Errors that can occur when requesting chunks from a [`ChunkPool`][crate::ChunkPool].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying allocator could not supply memory for a new block.
    ///
    /// The pool is left exactly as it was before the failed call, so the request may be retried
    /// once memory has been freed elsewhere.
    #[error("out of memory: the underlying allocator could not supply {bytes} bytes for a new block")]
    OutOfMemory {
        /// The number of bytes that were requested.
        bytes: usize,
    },

    /// A block of the configured number of chunks is too large to describe as a memory layout.
    #[error("a block of {chunks} chunks of {chunk_size} bytes exceeds the maximum allocation size")]
    BlockTooLarge {
        /// The number of chunks per block the pool was created with.
        chunks: usize,

        /// The size of one chunk, in bytes.
        chunk_size: usize,

        /// The reason the layout could not be calculated.
        #[source]
        source: LayoutError,
    },

    /// More than one contiguous chunk was requested. The pool only ever serves a single chunk
    /// per request.
    #[error("{requested} contiguous chunks were requested but a pool serves exactly one chunk per request")]
    UnsupportedCount {
        /// The number of chunks that were requested.
        requested: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::alloc::Layout;
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn out_of_memory_names_requested_size() {
        let error = Error::OutOfMemory { bytes: 4096 };

        assert!(error.to_string().contains("4096 bytes"));
    }

    #[test]
    fn block_too_large_exposes_layout_error() {
        let source = Layout::array::<u64>(usize::MAX).expect_err("array cannot fit in memory");

        let error = Error::BlockTooLarge {
            chunks: usize::MAX,
            chunk_size: 8,
            source,
        };

        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn unsupported_count_names_requested_count() {
        let error = Error::UnsupportedCount { requested: 3 };

        let result: Result<()> = Err(error);
        assert!(matches!(
            result,
            Err(Error::UnsupportedCount { requested: 3 })
        ));
    }
}
