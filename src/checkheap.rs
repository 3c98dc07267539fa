//! Consistency checker: walks the heap and the free lists, reporting every invariant
//! violation it finds rather than stopping at the first one. Gated behind the `checkheap`
//! Cargo feature so a release build of a client crate can opt in explicitly, the same way the
//! teacher gates its own optional debug/diagnostic code behind a feature flag rather than
//! `cfg!(debug_assertions)`.

extern crate std;

use crate::block::{BlockPtr, DSIZE, WSIZE};
use crate::heap::Heap;
use crate::sbrk::HeapExtender;
use crate::size_class::class_for_size;

macro_rules! report {
    ($($arg:tt)*) => { std::println!($($arg)*) };
}

/// Walks the heap from the prologue to the epilogue, then walks every free list, printing a
/// description of each violated invariant it finds (and the offending block's address/size
/// when `verbose` is set). Never panics; a single run surfaces every violation it can find.
///
/// Returns `true` if no violation was found.
pub fn checkheap<E: HeapExtender>(heap: &Heap<E>, verbose: bool) -> bool {
    let mut ok = true;
    let extender = heap.extender();
    let lo = extender.heap_low();
    let hi = extender.heap_high();

    unsafe {
        let prologue_hdr = lo.add(WSIZE) as *mut u32;
        let prologue = crate::block::read_tag(prologue_hdr);
        if prologue.size() != DSIZE || !prologue.is_allocated() {
            report!("checkheap: malformed prologue (size={}, alloc={})", prologue.size(), prologue.is_allocated());
            ok = false;
        }

        let mut cursor = BlockPtr::new(lo.add(4 * WSIZE) as *mut u8);
        let mut prev_was_free = false;
        let mut free_count_walk = 0usize;

        loop {
            let header = cursor.header();
            if header.size() == 0 {
                // epilogue.
                if !header.is_allocated() {
                    report!("checkheap: epilogue is not marked allocated");
                    ok = false;
                }
                break;
            }

            if cursor.as_ptr() as usize % DSIZE != 0 {
                report!("checkheap: block at {:p} is not 8-aligned", cursor.as_ptr());
                ok = false;
            }
            if header.size() % DSIZE != 0 {
                report!("checkheap: block at {:p} has size {} not a multiple of 8", cursor.as_ptr(), header.size());
                ok = false;
            }
            let footer = cursor.footer(header.size());
            if header != footer {
                report!("checkheap: block at {:p} header/footer mismatch", cursor.as_ptr());
                ok = false;
            }
            if !header.is_allocated() {
                if prev_was_free {
                    report!("checkheap: two adjacent free blocks meeting at {:p}", cursor.as_ptr());
                    ok = false;
                }
                free_count_walk += 1;
            }
            prev_was_free = !header.is_allocated();

            let next = cursor.next_block(header.size());
            if (next.as_ptr() as *const u8) > hi {
                report!("checkheap: block at {:p} runs past heap_high", cursor.as_ptr());
                ok = false;
                break;
            }
            cursor = next;
        }

        let registry = heap.registry();
        let mut free_count_lists = 0usize;
        for class in 0..crate::size_class::NUM_CLASSES {
            let mut node = registry.root(class);
            let mut prev = None;
            while let Some(block) = node {
                free_count_lists += 1;
                if block.is_allocated() {
                    report!("checkheap: block at {:p} is on free list {} but marked allocated", block.as_ptr(), class);
                    ok = false;
                }
                if class_for_size(block.size()) != class {
                    report!("checkheap: block at {:p} (size {}) is on the wrong free list {}", block.as_ptr(), block.size(), class);
                    ok = false;
                }
                if block.prev_free() != prev {
                    report!("checkheap: block at {:p} has a broken prev link", block.as_ptr());
                    ok = false;
                }
                let addr = block.as_ptr() as *const u8;
                if addr < lo || addr >= hi {
                    report!("checkheap: free-list link at {:p} lies outside the heap", block.as_ptr());
                    ok = false;
                }
                prev = Some(block);
                node = block.next_free();
            }
        }

        if free_count_walk != free_count_lists {
            report!(
                "checkheap: heap walk found {} free blocks but the free lists hold {}",
                free_count_walk, free_count_lists
            );
            ok = false;
        }

        if verbose {
            report!(
                "checkheap: walked heap [{:p}, {:p}), {} free blocks on {} lists",
                lo, hi, free_count_walk, free_count_lists
            );
        }
    }

    ok
}
