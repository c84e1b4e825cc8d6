//! Aligned staging buffer for Direct I/O.
//!
//! With `O_DIRECT` on Linux, the memory a transfer reads from must start on a
//! block boundary (typically 4096 bytes). `AlignedBuffer` over-allocates a
//! plain `Vec<u8>` by one alignment unit and works inside the aligned window of
//! that allocation, so no unsafe allocation code is needed.
//!
//! The buffer is a contiguous run of valid bytes starting at the aligned base.
//! [`AlignedBuffer::consume`] drops a written prefix and moves the remainder
//! back to the base, which keeps the front of the data aligned after a short
//! write.

/// A fixed-capacity byte buffer whose first byte is aligned.
#[derive(Debug)]
pub struct AlignedBuffer {
    storage: Vec<u8>,
    /// Index of the first aligned byte inside `storage`.
    base: usize,
    capacity: usize,
    len: usize,
    alignment: usize,
}

impl AlignedBuffer {
    /// Creates an empty buffer of `capacity` bytes aligned to `alignment`.
    ///
    /// An `alignment` of zero produces an unaligned buffer. A positive
    /// alignment must be a power of two.
    pub fn new(capacity: usize, alignment: usize) -> Self {
        let slack = alignment;
        let storage = vec![0u8; capacity + slack];
        let base = if alignment > 0 {
            storage.as_ptr().align_offset(alignment).min(slack)
        } else {
            0
        };

        Self {
            storage,
            base,
            capacity,
            len: 0,
            alignment,
        }
    }

    /// Creates a buffer holding a copy of `data`, with capacity for exactly it.
    pub fn from_data(data: &[u8], alignment: usize) -> Self {
        let mut buf = Self::new(data.len(), alignment);
        buf.extend_from_slice(data);
        buf
    }

    /// Returns the valid bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.base..self.base + self.len]
    }

    /// Returns the whole capacity as a mutable slice, ignoring the length.
    ///
    /// Used as the target of block-sized reads; follow with [`Self::set_len`].
    pub fn as_mut_capacity(&mut self) -> &mut [u8] {
        &mut self.storage[self.base..self.base + self.capacity]
    }

    /// Sets the number of valid bytes.
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.capacity, "length exceeds buffer capacity");
        self.len = len;
    }

    /// Returns the number of valid bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes that still fit.
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Returns the alignment of the first byte.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Appends `data`, which must fit in the remaining capacity.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        assert!(data.len() <= self.remaining(), "buffer overflow");
        let start = self.base + self.len;
        self.storage[start..start + data.len()].copy_from_slice(data);
        self.len += data.len();
    }

    /// Drops the first `n` valid bytes, moving the rest to the aligned base.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len, "cannot consume more than the buffered bytes");
        if n == self.len {
            self.len = 0;
            return;
        }
        let start = self.base;
        self.storage.copy_within(start + n..start + self.len, start);
        self.len -= n;
    }

    /// Discards all valid bytes.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
