//! Free-list registry: eight segregated, doubly-linked, LIFO free lists.
//!
//! Each class root lives in this one small aggregate rather than scattered function-statics,
//! matching Design Notes' preference for an explicit owned value over the reference source's
//! per-class static globals.

use crate::block::BlockPtr;
use crate::size_class::{class_for_size, NUM_CLASSES};

/// The eight class roots. A block is linked through the first 16 bytes of its own payload,
/// so the registry itself is just pointers to list heads.
pub(crate) struct FreeListRegistry {
    roots: [Option<BlockPtr>; NUM_CLASSES],
}

impl FreeListRegistry {
    pub(crate) const fn new() -> Self {
        Self {
            roots: [None; NUM_CLASSES],
        }
    }

    pub(crate) fn root(&self, class: usize) -> Option<BlockPtr> {
        self.roots[class]
    }

    fn set_root(&mut self, class: usize, block: Option<BlockPtr>) {
        self.roots[class] = block;
    }

    /// Links `b` (size already written into its header) at the head of its class list.
    ///
    /// # Safety
    /// `b` must be a free block not currently on any list, with a valid header.
    pub(crate) unsafe fn link(&mut self, b: BlockPtr) {
        let class = class_for_size(b.size());
        let old_root = self.root(class);

        b.set_prev_free(None);
        b.set_next_free(old_root);
        if let Some(old_root) = old_root {
            old_root.set_prev_free(Some(b));
        }
        self.set_root(class, Some(b));
    }

    /// Removes `b` from whichever class list it currently occupies.
    ///
    /// # Safety
    /// `b` must currently be linked into the list selected by its own size.
    pub(crate) unsafe fn unlink(&mut self, b: BlockPtr) {
        let class = class_for_size(b.size());
        let prev = b.prev_free();
        let next = b.next_free();

        match prev {
            Some(prev) => prev.set_next_free(next),
            None => self.set_root(class, next),
        }
        if let Some(next) = next {
            next.set_prev_free(prev);
        }
    }
}
