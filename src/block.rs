//! Block layout and boundary-tag accessors.
//!
//! Every block in the heap is a contiguous, 8-byte aligned span carrying a 4-byte header
//! and a 4-byte footer (see [`crate::heap`] for how prologue/epilogue sentinels bound the
//! walk). Free blocks additionally carry a forward/backward link pair in the first 16 bytes
//! of their payload; those bytes are simply unused storage while a block is allocated.

use core::ptr::NonNull;

use modular_bitfield::prelude::*;

/// Word size in bytes. Headers and footers are one word each.
pub(crate) const WSIZE: usize = 4;

/// Double-word size in bytes. Every block size and every payload pointer is a multiple of this.
pub(crate) const DSIZE: usize = 8;

/// Minimum block size: header(4) + next-link(8) + prev-link(8) + footer(4).
pub(crate) const MIN_BLOCK_SIZE: usize = 24;

/// A boundary tag: the encoded contents of a header or footer word.
///
/// Bit 0 is the allocated flag; bits 1-2 are reserved and always zero; the remaining 29 bits
/// hold the block size in units of 8 bytes, which comfortably covers any heap this allocator
/// can grow to via the extension primitive.
#[bitfield]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u32)]
pub(crate) struct Tag {
    allocated: bool,
    #[skip]
    __: B2,
    size_words: B29,
}

impl Tag {
    /// Builds a tag for a block of the given `size` (bytes, a multiple of 8) and allocation state.
    pub(crate) fn pack(size: usize, allocated: bool) -> Self {
        debug_assert_eq!(size % DSIZE, 0, "block size must be a multiple of 8");
        Self::new()
            .with_allocated(allocated)
            .with_size_words(u32::try_from(size / DSIZE).expect("block size exceeds 2^32 bytes"))
    }

    /// Total block size in bytes, header and footer included.
    pub(crate) fn size(self) -> usize {
        self.size_words() as usize * DSIZE
    }

    pub(crate) fn is_allocated(self) -> bool {
        self.allocated()
    }
}

/// Raw `u32` encoding of a tag, for callers that poke a header/footer word directly rather
/// than going through a `BlockPtr` (the prologue/epilogue sentinels, and test fixtures
/// building fake ones).
pub(crate) fn tag_raw(size: usize, allocated: bool) -> u32 {
    u32::from_ne_bytes(Tag::pack(size, allocated).into_bytes())
}

/// Reads a tag from a raw header/footer address not wrapped in a `BlockPtr` (the prologue,
/// whose address is not itself a valid `bp`).
#[cfg(feature = "checkheap")]
pub(crate) unsafe fn read_tag(ptr: *mut u32) -> Tag {
    Tag::from_bytes(ptr.read_unaligned().to_ne_bytes())
}

/// Pointer to a block's payload (`bp` in the specification): one word past the header.
///
/// All of this module's free functions take a `BlockPtr` and navigate purely through pointer
/// arithmetic and raw reads/writes; there is no safe wrapper above this, the same way the
/// kernel heap allocator manipulates [`crate::mem`]-style address wrappers directly rather
/// than through a checked API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct BlockPtr(NonNull<u8>);

impl BlockPtr {
    /// Wraps a raw payload pointer. The caller must ensure it is non-null and 8-aligned.
    pub(crate) unsafe fn new(bp: *mut u8) -> Self {
        debug_assert_eq!(bp as usize % DSIZE, 0, "block pointer must be 8-aligned");
        Self(NonNull::new_unchecked(bp))
    }

    pub(crate) fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    fn header_ptr(self) -> *mut u32 {
        unsafe { self.0.as_ptr().sub(WSIZE).cast() }
    }

    fn footer_ptr(self, size: usize) -> *mut u32 {
        unsafe { self.0.as_ptr().add(size).sub(DSIZE).cast() }
    }

    /// Reads this block's header tag.
    pub(crate) unsafe fn header(self) -> Tag {
        Tag::from_bytes(self.header_ptr().read_unaligned().to_ne_bytes())
    }

    /// Reads this block's footer tag, given its (already known) size.
    pub(crate) unsafe fn footer(self, size: usize) -> Tag {
        Tag::from_bytes(self.footer_ptr(size).read_unaligned().to_ne_bytes())
    }

    /// Writes matching header and footer tags for a block of `size` bytes.
    pub(crate) unsafe fn set_tags(self, size: usize, allocated: bool) {
        let tag = Tag::pack(size, allocated);
        let raw = u32::from_ne_bytes(tag.into_bytes());
        self.header_ptr().write_unaligned(raw);
        self.footer_ptr(size).write_unaligned(raw);
    }

    /// Convenience: total size of this block, read from its header.
    pub(crate) unsafe fn size(self) -> usize {
        self.header().size()
    }

    /// Convenience: whether this block is currently marked allocated.
    pub(crate) unsafe fn is_allocated(self) -> bool {
        self.header().is_allocated()
    }

    /// The block immediately following this one in address order.
    pub(crate) unsafe fn next_block(self, size: usize) -> BlockPtr {
        BlockPtr::new(self.0.as_ptr().add(size))
    }

    /// The footer tag of the block immediately preceding this one.
    pub(crate) unsafe fn prev_footer(self) -> Tag {
        Tag::from_bytes(
            self.0
                .as_ptr()
                .sub(DSIZE)
                .cast::<u32>()
                .read_unaligned()
                .to_ne_bytes(),
        )
    }

    /// The block immediately preceding this one, given the previous block's size.
    pub(crate) unsafe fn prev_block(self, prev_size: usize) -> BlockPtr {
        BlockPtr::new(self.0.as_ptr().sub(prev_size))
    }

    fn link_slot(self, forward: bool) -> *mut *mut u8 {
        let offset = if forward { 0 } else { DSIZE };
        unsafe { self.0.as_ptr().add(offset).cast() }
    }

    /// Reads the forward free-list link stored in this block's payload.
    pub(crate) unsafe fn next_free(self) -> Option<BlockPtr> {
        NonNull::new(self.link_slot(true).read_unaligned()).map(BlockPtr)
    }

    /// Reads the backward free-list link stored in this block's payload.
    pub(crate) unsafe fn prev_free(self) -> Option<BlockPtr> {
        NonNull::new(self.link_slot(false).read_unaligned()).map(BlockPtr)
    }

    /// Overwrites the forward free-list link stored in this block's payload.
    pub(crate) unsafe fn set_next_free(self, next: Option<BlockPtr>) {
        self.link_slot(true)
            .write_unaligned(next.map_or(core::ptr::null_mut(), |b| b.as_ptr()));
    }

    /// Overwrites the backward free-list link stored in this block's payload.
    pub(crate) unsafe fn set_prev_free(self, prev: Option<BlockPtr>) {
        self.link_slot(false)
            .write_unaligned(prev.map_or(core::ptr::null_mut(), |b| b.as_ptr()));
    }
}
