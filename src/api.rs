//! The client-facing free-function surface: `init`, `allocate`, `free`, `reallocate`,
//! `zeroed_allocate`, each going through one lazily-initialized, mutex-guarded process-wide
//! [`heap::Heap`] instance, mirroring the teacher's own `OnceCell<Mutex<T>>` singletons
//! (`GLOBAL_SCHEDULER`, `KERNEL_HEAP_ALLOCATOR`) plus their small free-function surface,
//! rather than exposing the struct directly to the client.

use core::ptr::NonNull;

use conquer_once::spin::OnceCell;
use spin::Mutex;

use crate::heap::Heap;
use crate::sbrk::DefaultBrk;

static HEAP: OnceCell<Mutex<Heap<DefaultBrk>>> = OnceCell::uninit();

fn global_heap() -> &'static Mutex<Heap<DefaultBrk>> {
    HEAP.get_or_init(|| Mutex::new(Heap::new(DefaultBrk::new())))
}

/// Prepares the heap. Callable multiple times; a call after the first successful one is a
/// no-op that returns success, matching the design's init-if-uninitialized resolution of the
/// reference source's ambiguity here.
///
/// Returns `0` on success, `-1` if the underlying heap-extension primitive refused to supply
/// the first chunk.
pub fn init() -> i32 {
    match global_heap().lock().init() {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// See [`Heap::allocate`].
pub fn allocate(size: usize) -> Option<NonNull<u8>> {
    global_heap().lock().allocate(size)
}

/// See [`Heap::free`].
pub fn free(payload: Option<NonNull<u8>>) {
    global_heap().lock().free(payload)
}

/// See [`Heap::reallocate`].
pub fn reallocate(payload: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    global_heap().lock().reallocate(payload, size)
}

/// See [`Heap::zeroed_allocate`].
pub fn zeroed_allocate(nmemb: usize, size: usize) -> Option<NonNull<u8>> {
    global_heap().lock().zeroed_allocate(nmemb, size)
}

#[cfg(feature = "checkheap")]
pub fn checkheap(verbose: bool) -> bool {
    crate::checkheap::checkheap(&global_heap().lock(), verbose)
}
