use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// One chunk of a block.
///
/// A chunk is either free, in which case its storage holds a [`Link`] to the next free chunk,
/// or allocated, in which case its storage belongs to the caller and we never touch it. The union
/// gives us a size and alignment that suits both uses.
///
/// All fields of a `#[repr(C)]` union live at offset zero, so a pointer to the slot is also a
/// pointer to the link and a pointer to the caller's `T`.
#[repr(C)]
pub(crate) union Slot<T> {
    next: Link<T>,

    _value: ManuallyDrop<T>,
}

/// The link stored in a free chunk. `None` terminates the free list.
pub(crate) type Link<T> = Option<NonNull<Slot<T>>>;

impl<T> Slot<T> {
    /// Interprets the storage of a free chunk as a link and reads it.
    ///
    /// # Safety
    ///
    /// `slot` must point to a chunk inside a live block whose link was last written by
    /// [`write_link()`][Self::write_link] and which has not been handed out since.
    #[must_use]
    pub(crate) unsafe fn read_link(slot: NonNull<Self>) -> Link<T> {
        // SAFETY: The caller guarantees the chunk is free, which means its storage holds an
        // initialized link at offset zero.
        unsafe { slot.cast::<Link<T>>().read() }
    }

    /// Interprets the storage of a chunk as a link and overwrites it, making the chunk free.
    ///
    /// # Safety
    ///
    /// `slot` must point to a chunk inside a live block and nobody may be using the chunk's
    /// storage for anything else.
    pub(crate) unsafe fn write_link(slot: NonNull<Self>, next: Link<T>) {
        // SAFETY: The caller guarantees the chunk is valid for writes and unused. The slot is
        // at least as large and as aligned as a link.
        unsafe { slot.cast::<Link<T>>().write(next) };
    }

    #[must_use]
    pub(crate) fn value_ptr(slot: NonNull<Self>) -> NonNull<T> {
        slot.cast()
    }

    #[must_use]
    pub(crate) fn from_value_ptr(value: NonNull<T>) -> NonNull<Self> {
        value.cast()
    }
}
