//! Diagnostic binary: drives the process-wide allocator through a short workload and prints
//! the result of the consistency checker. Only built with `--features checkheap`.

fn main() {
    assert_eq!(fzalloc::init(), 0, "heap initialization failed");

    let mut live = Vec::new();
    for size in [16, 100, 448, 1024, 4096] {
        if let Some(p) = fzalloc::allocate(size) {
            live.push(p);
        }
    }

    fzalloc::checkheap(true);

    for p in live.drain(..).take(2) {
        fzalloc::free(Some(p));
    }

    fzalloc::checkheap(true);
}
