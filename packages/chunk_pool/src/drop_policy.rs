/// Determines what happens when a pool is dropped while some of its chunks are still allocated.
///
/// The pool never runs destructors for values stored in chunks; it only decides whether it is
/// acceptable to release the memory under them.
///
/// # Examples
///
/// ```
/// use chunk_pool::{ChunkPool, DropPolicy};
///
/// // The drop policy is set at pool creation time.
/// let pool = ChunkPool::<u32, 16>::builder()
///     .drop_policy(DropPolicy::MustNotReleaseLiveChunks)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool releases all of its blocks when dropped, even if chunks are still allocated.
    /// Using such chunks afterwards is undefined behavior. This is the default.
    #[default]
    MayReleaseLiveChunks,

    /// The pool will panic if any chunk is still allocated when it is dropped.
    ///
    /// This may be valuable to verify that every chunk handed out was returned, for example
    /// when a container built on top of the pool is expected to clean up after itself.
    MustNotReleaseLiveChunks,
}
