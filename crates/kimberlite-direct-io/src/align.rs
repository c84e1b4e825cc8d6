//! Alignment arithmetic for block-granular transfers.

/// Default block size for cache-bypassing transfers (4 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Returns true if `ptr` is aligned to `n` bytes.
///
/// An alignment of zero means the platform imposes no requirement, so every
/// address qualifies.
pub fn is_aligned(ptr: *const u8, n: usize) -> bool {
    n == 0 || ptr.addr() % n == 0
}

/// Returns true if the file `offset` is a multiple of a positive `alignment`.
pub fn is_offset_aligned(offset: u64, alignment: usize) -> bool {
    alignment == 0 || offset % alignment as u64 == 0
}

/// Rounds `length` down to the largest multiple of `block_size` not above it.
pub fn align_down(length: usize, block_size: usize) -> usize {
    debug_assert!(block_size > 0, "block size must be positive");
    length - length % block_size
}

/// Rounds `value` up to the nearest multiple of `alignment`.
pub fn round_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment > 0, "alignment must be positive");
    debug_assert!(
        alignment.is_power_of_two(),
        "alignment must be a power of two"
    );
    (value + alignment - 1) & !(alignment - 1)
}
