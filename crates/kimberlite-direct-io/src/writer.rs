//! Alignment-aware buffered writer for cache-bypassing appends.
//!
//! [`DirectWriter`] accepts arbitrarily sized appends and turns them into
//! transfers a bypass handle will accept:
//!
//! - When nothing is staged and the caller's slice starts on an aligned
//!   address at an aligned file offset, the block-multiple prefix of the slice
//!   is written straight from caller memory (the zero-copy fast path) and only
//!   the sub-block tail is copied into the staging buffer.
//! - Otherwise bytes are copied into the block-sized, block-aligned staging
//!   buffer, and every time it fills it is written as one full block.
//!
//! # Flush
//!
//! The staged tail of a flush is shorter than a block, which a flag-based
//! bypass handle rejects. Flush therefore drops the bypass attribute, writes
//! the tail through the page cache, and turns bypass back on.
//!
//! After such a flush the file offset sits inside a block. If the handle has a
//! positive alignment requirement, the next staged write covers only the bytes
//! up to the following block boundary and goes through the cache the same way,
//! so that every later block write starts aligned again.
//!
//! # Failure
//!
//! A short or failed transfer inside [`DirectWriter::write`], a failure to turn
//! bypass back on, or a failed durability sync leaves the file in a state the
//! writer cannot describe. These poison the writer: every later operation
//! except [`DirectWriter::close`] fails with [`IoError::Poisoned`]. A short or
//! failed write during [`DirectWriter::flush`] does not poison; the unwritten
//! bytes stay staged and the next flush retries them.

use std::io::{self, SeekFrom};

use crate::IoError;
use crate::align::{align_down, is_aligned, is_offset_aligned};
use crate::aligned::AlignedBuffer;
use crate::bypass::{require_bypass, set_bypass};
use crate::handle::BypassHandle;
use crate::options::{DirectIoOptions, SyncMode};

/// Counters describing how a writer moved its bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Bytes written straight from caller memory.
    pub fast_path_bytes: u64,
    /// Full staged blocks written with bypass on.
    pub block_writes: u64,
    /// Transfers issued with bypass temporarily off.
    pub cached_writes: u64,
    /// Flush calls that had staged bytes to deliver.
    pub flushes: u64,
}

/// Buffered writer over an exclusively owned bypass handle.
///
/// Not internally synchronised: one logical writer per open file.
#[derive(Debug)]
pub struct DirectWriter<H: BypassHandle> {
    /// `None` once closed.
    handle: Option<H>,
    /// Bytes destined for `[offset, offset + buffer.len())`.
    buffer: AlignedBuffer,
    block_size: usize,
    align: usize,
    /// File position of the first staged byte.
    offset: u64,
    sync_mode: SyncMode,
    /// Kind and message of the first fatal error.
    poisoned: Option<(io::ErrorKind, String)>,
    stats: WriterStats,
}

impl<H: BypassHandle> DirectWriter<H> {
    /// Wraps `handle`, which must already be in bypass mode.
    ///
    /// Appending starts at the handle's current position. The handle is
    /// dropped (closed) if construction fails.
    pub fn new(mut handle: H, options: &DirectIoOptions) -> Result<Self, IoError> {
        options.validate()?;
        require_bypass(&handle)?;
        let align = options.effective_alignment(handle.align_requirement())?;
        let offset = handle.stream_position()?;

        Ok(Self {
            handle: Some(handle),
            buffer: AlignedBuffer::new(options.block_size, options.block_size),
            block_size: options.block_size,
            align,
            offset,
            sync_mode: options.sync_mode,
            poisoned: None,
            stats: WriterStats::default(),
        })
    }

    /// Appends `data`, returning its full length on success.
    ///
    /// The bytes reach the handle no later than the next successful flush. An
    /// error poisons the writer.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, IoError> {
        self.check_usable()?;
        let total = data.len();
        let mut data = data;

        while data.len() >= self.free() {
            if self.buffer.is_empty() && self.fast_path_allowed(data) {
                let prefix = align_down(data.len(), self.block_size);
                self.write_direct(&data[..prefix])?;
                data = &data[prefix..];
                break;
            }

            let take = self.free();
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];
            self.write_staged()?;
        }

        self.buffer.extend_from_slice(data);
        debug_assert!(self.buffer.len() < self.block_size);
        Ok(total)
    }

    /// Delivers the staged bytes, passing them through the page cache.
    ///
    /// A no-op when nothing is staged. On a short write the remainder stays
    /// staged and [`IoError::ShortWrite`] is returned.
    pub fn flush(&mut self) -> Result<(), IoError> {
        self.check_usable()?;
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.stats.flushes += 1;
        let pending = self.buffer.len();
        self.write_through_cache()?;
        tracing::debug!(bytes = pending, offset = self.offset, "flushed staged bytes");
        Ok(())
    }

    /// Flushes, then asks the OS to make the file durable.
    pub fn sync(&mut self) -> Result<(), IoError> {
        self.flush()?;
        let mode = self.sync_mode;
        let handle = self.handle.as_mut().ok_or(IoError::AlreadyClosed)?;
        if let Err(e) = handle.sync(mode) {
            return Err(self.poison(e));
        }
        Ok(())
    }

    /// Flushes staged bytes, then moves the handle's position.
    ///
    /// Staged bytes always land where they were appended, never at the new
    /// position. If the flush fails the position is unchanged.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        self.flush()?;
        let handle = self.handle.as_mut().ok_or(IoError::AlreadyClosed)?;
        let position = handle.seek(pos)?;
        self.offset = position;
        Ok(position)
    }

    /// Flushes and releases the handle.
    ///
    /// The handle is released even if the flush fails; the flush error is
    /// still returned. Later calls fail with [`IoError::AlreadyClosed`].
    pub fn close(&mut self) -> Result<(), IoError> {
        if self.handle.is_none() {
            return Err(IoError::AlreadyClosed);
        }

        let flushed = match self.poisoned_error() {
            Some(err) => Err(err),
            None => self.flush(),
        };
        if !self.buffer.is_empty() {
            tracing::warn!(
                bytes = self.buffer.len(),
                offset = self.offset,
                "discarding undelivered bytes on close"
            );
            self.buffer.clear();
        }

        drop(self.handle.take());
        tracing::debug!(offset = self.offset, "closed direct writer");
        flushed
    }

    /// Returns the number of staged bytes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the alignment enforced on bypass transfers.
    pub fn align_requirement(&self) -> usize {
        self.align
    }

    /// Returns the file position the next delivered byte lands at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the transfer counters.
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// Returns true after a fatal error.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Returns true after [`Self::close`].
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Returns the handle, unless closed.
    ///
    /// Writing to the handle directly breaks the writer's offset tracking.
    pub fn get_ref(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    fn check_usable(&self) -> Result<(), IoError> {
        if self.handle.is_none() {
            return Err(IoError::AlreadyClosed);
        }
        match self.poisoned_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn poisoned_error(&self) -> Option<IoError> {
        self.poisoned
            .as_ref()
            .map(|(kind, cause)| IoError::Poisoned {
                kind: *kind,
                cause: cause.clone(),
            })
    }

    /// Bytes the buffer may still take before it must be written.
    fn free(&self) -> usize {
        self.window() - self.buffer.len()
    }

    /// Distance from the first staged byte to the next block boundary.
    fn window(&self) -> usize {
        if self.align == 0 {
            return self.block_size;
        }
        self.block_size - (self.offset % self.block_size as u64) as usize
    }

    /// The direct prefix is a block multiple, so with a positive alignment the
    /// offset must sit on a block boundary for the sub-block tail to fit in
    /// the window.
    fn fast_path_allowed(&self, data: &[u8]) -> bool {
        if !is_aligned(data.as_ptr(), self.align) {
            return false;
        }
        self.align == 0 || is_offset_aligned(self.offset, self.block_size)
    }

    /// Whether a staged transfer of `len` bytes is legal with bypass on.
    fn staged_bypass_legal(&self, len: usize) -> bool {
        self.align == 0 || (len % self.align == 0 && is_offset_aligned(self.offset, self.align))
    }

    fn write_direct(&mut self, data: &[u8]) -> Result<(), IoError> {
        let handle = self.handle.as_mut().ok_or(IoError::AlreadyClosed)?;
        let written = match handle.write(data) {
            Ok(n) => n,
            Err(e) => return Err(self.poison(e.into())),
        };
        self.offset += written as u64;
        if written < data.len() {
            return Err(self.poison(IoError::ShortWrite {
                requested: data.len(),
                written,
            }));
        }

        self.stats.fast_path_bytes += written as u64;
        tracing::trace!(bytes = written, offset = self.offset, "fast-path write");
        Ok(())
    }

    /// Writes the full window of staged bytes.
    fn write_staged(&mut self) -> Result<(), IoError> {
        let requested = self.buffer.len();
        if !self.staged_bypass_legal(requested) {
            tracing::debug!(
                bytes = requested,
                offset = self.offset,
                "realigning to a block boundary through the page cache"
            );
            return self.write_through_cache().map_err(|e| self.poison(e));
        }

        let handle = self.handle.as_mut().ok_or(IoError::AlreadyClosed)?;
        let written = match handle.write(self.buffer.as_slice()) {
            Ok(n) => n,
            Err(e) => return Err(self.poison(e.into())),
        };
        self.buffer.consume(written);
        self.offset += written as u64;
        if written < requested {
            return Err(self.poison(IoError::ShortWrite { requested, written }));
        }

        self.stats.block_writes += 1;
        tracing::trace!(bytes = written, offset = self.offset, "block write");
        Ok(())
    }

    /// Writes all staged bytes with bypass off, then turns bypass back on.
    ///
    /// A failure to re-enable bypass poisons the writer and takes precedence
    /// over a write error, which is logged.
    fn write_through_cache(&mut self) -> Result<(), IoError> {
        let handle = self.handle.as_mut().ok_or(IoError::AlreadyClosed)?;
        set_bypass(handle, false)?;
        self.stats.cached_writes += 1;

        let requested = self.buffer.len();
        let written = handle.write(self.buffer.as_slice());
        let restored = set_bypass(handle, true);

        let outcome = match written {
            Ok(n) => {
                self.buffer.consume(n);
                self.offset += n as u64;
                if n < requested {
                    Err(IoError::ShortWrite {
                        requested,
                        written: n,
                    })
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(IoError::from(e)),
        };

        if let Err(restore_err) = restored {
            if let Err(e) = &outcome {
                tracing::error!(error = %e, "cached write failed before bypass could be restored");
            }
            return Err(self.poison(restore_err));
        }
        outcome
    }

    /// Records the first fatal error and hands it back.
    fn poison(&mut self, err: IoError) -> IoError {
        if self.poisoned.is_none() {
            tracing::error!(error = %err, offset = self.offset, "direct writer poisoned");
            self.poisoned = Some((err.kind(), err.to_string()));
        }
        err
    }
}

impl<H: BypassHandle> Drop for DirectWriter<H> {
    fn drop(&mut self) {
        if self.handle.is_none() || self.poisoned.is_some() || self.buffer.is_empty() {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::error!(error = %e, "failed to flush direct writer during drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Seek;

    use super::*;
    use crate::memory::{Fault, MemoryHandle, MemoryOp, MemoryStorage};

    const BLOCK: usize = 4096;

    fn writer(align: usize) -> (DirectWriter<MemoryHandle>, MemoryStorage) {
        let handle = MemoryHandle::new(align);
        let storage = handle.storage();
        let writer = DirectWriter::new(handle, &DirectIoOptions::default()).unwrap();
        storage.clear_ops();
        (writer, storage)
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn aligned_block_multiple_takes_fast_path() {
        let (mut w, storage) = writer(BLOCK);
        let data = AlignedBuffer::from_data(&pattern(2 * BLOCK, 1), BLOCK);

        assert_eq!(w.write(data.as_slice()).unwrap(), 2 * BLOCK);
        assert_eq!(w.buffered(), 0);
        assert_eq!(storage.writes(), vec![(0, 2 * BLOCK, true)]);
        assert_eq!(w.stats().fast_path_bytes, 2 * BLOCK as u64);
        assert_eq!(storage.contents(), data.as_slice());
    }

    #[test]
    fn aligned_prefix_is_direct_and_tail_is_staged() {
        let (mut w, storage) = writer(BLOCK);
        let data = AlignedBuffer::from_data(&pattern(BLOCK + 10, 2), BLOCK);

        w.write(data.as_slice()).unwrap();
        assert_eq!(storage.writes(), vec![(0, BLOCK, true)]);
        assert_eq!(w.buffered(), 10);
        assert_eq!(w.offset(), BLOCK as u64);
    }

    #[test]
    fn misaligned_source_goes_through_buffer() {
        let (mut w, storage) = writer(BLOCK);
        let source = AlignedBuffer::from_data(&pattern(2 * BLOCK + 1, 3), BLOCK);
        let data = &source.as_slice()[1..];

        w.write(data).unwrap();
        assert_eq!(storage.writes(), vec![(0, BLOCK, true), (BLOCK as u64, BLOCK, true)]);
        assert_eq!(w.stats().fast_path_bytes, 0);
        assert_eq!(w.stats().block_writes, 2);
        assert_eq!(storage.contents(), data);
    }

    #[test]
    fn small_writes_accumulate_until_a_block_fills() {
        let (mut w, storage) = writer(BLOCK);
        let data = pattern(BLOCK, 4);

        w.write(&data[..1000]).unwrap();
        w.write(&data[1000..3000]).unwrap();
        assert!(storage.writes().is_empty());
        assert_eq!(w.buffered(), 3000);

        w.write(&data[3000..]).unwrap();
        assert_eq!(w.buffered(), 0);
        assert_eq!(storage.writes(), vec![(0, BLOCK, true)]);
        assert_eq!(storage.contents(), data);
    }

    #[test]
    fn zero_alignment_always_uses_fast_path() {
        let (mut w, storage) = writer(0);
        let source = pattern(3 * BLOCK + 7, 5);

        w.write(&source[1..]).unwrap();
        assert_eq!(storage.writes(), vec![(0, 3 * BLOCK, true)]);
        assert_eq!(w.buffered(), 6);
    }

    #[test]
    fn flush_on_empty_buffer_is_a_no_op() {
        let (mut w, storage) = writer(BLOCK);
        w.flush().unwrap();
        w.flush().unwrap();
        assert!(storage.ops().is_empty());
        assert_eq!(w.stats().flushes, 0);
    }

    #[test]
    fn flush_drops_and_restores_bypass_around_tail() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"hello").unwrap();
        w.flush().unwrap();

        assert_eq!(
            storage.ops(),
            vec![
                MemoryOp::SetBypass(false),
                MemoryOp::Write {
                    offset: 0,
                    len: 5,
                    bypass: false
                },
                MemoryOp::SetBypass(true),
            ]
        );
        assert!(storage.bypass());
        assert_eq!(w.buffered(), 0);
        assert_eq!(storage.contents(), b"hello");
    }

    #[test]
    fn short_flush_keeps_remainder_for_retry() {
        let (mut w, storage) = writer(BLOCK);
        let data = pattern(100, 6);
        w.write(&data).unwrap();

        storage.inject(Fault::ShortWrite(30));
        let err = w.flush().unwrap_err();
        assert!(matches!(
            err,
            IoError::ShortWrite {
                requested: 100,
                written: 30
            }
        ));
        assert_eq!(w.buffered(), 70);
        assert!(!w.is_poisoned());
        assert!(storage.bypass());

        w.flush().unwrap();
        assert_eq!(w.buffered(), 0);
        assert_eq!(storage.contents(), data);
    }

    #[test]
    fn flush_write_error_is_recoverable() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"retry me").unwrap();

        storage.inject(Fault::WriteError(std::io::ErrorKind::Interrupted));
        assert!(matches!(w.flush(), Err(IoError::Io { .. })));
        assert_eq!(w.buffered(), 8);
        assert!(storage.bypass());

        w.flush().unwrap();
        assert_eq!(storage.contents(), b"retry me");
    }

    #[test]
    fn failed_disable_writes_nothing() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"pending").unwrap();

        storage.inject(Fault::SetBypass);
        assert!(matches!(
            w.flush(),
            Err(IoError::AttributeSet { enabled: false, .. })
        ));
        assert!(storage.writes().is_empty());
        assert_eq!(w.buffered(), 7);
        assert!(!w.is_poisoned());
    }

    #[test]
    fn failed_restore_poisons_after_delivering_bytes() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"durable").unwrap();

        storage.inject(Fault::EnableBypass);
        assert!(matches!(
            w.flush(),
            Err(IoError::AttributeSet { enabled: true, .. })
        ));
        assert_eq!(storage.contents(), b"durable");
        assert_eq!(w.buffered(), 0);
        assert!(w.is_poisoned());
        assert!(matches!(w.write(b"x"), Err(IoError::Poisoned { .. })));
        assert!(matches!(w.flush(), Err(IoError::Poisoned { .. })));
    }

    #[test]
    fn block_write_failure_poisons() {
        let (mut w, storage) = writer(BLOCK);
        storage.inject(Fault::WriteError(std::io::ErrorKind::Other));

        assert!(matches!(w.write(&pattern(BLOCK, 7)), Err(IoError::Io { .. })));
        assert!(w.is_poisoned());
        assert!(matches!(w.write(b"more"), Err(IoError::Poisoned { .. })));
        assert!(matches!(w.sync(), Err(IoError::Poisoned { .. })));
        assert!(matches!(w.close(), Err(IoError::Poisoned { .. })));
        assert!(w.is_closed());
    }

    #[test]
    fn short_block_write_poisons() {
        let (mut w, storage) = writer(BLOCK);
        storage.inject(Fault::ShortWrite(BLOCK / 2));
        let data = AlignedBuffer::from_data(&pattern(BLOCK, 8), BLOCK);

        assert!(matches!(
            w.write(data.as_slice()),
            Err(IoError::ShortWrite { written, .. }) if written == BLOCK / 2
        ));
        assert!(w.is_poisoned());
    }

    #[test]
    fn writes_after_partial_flush_realign_to_block_boundary() {
        let (mut w, storage) = writer(BLOCK);
        let data = pattern(3 * BLOCK, 9);

        w.write(&data[..10]).unwrap();
        w.flush().unwrap();
        assert_eq!(w.offset(), 10);

        storage.clear_ops();
        w.write(&data[10..]).unwrap();

        // The first transfer closes the gap to the block boundary through the
        // cache; everything after it is a legal bypass block.
        let writes = storage.writes();
        assert_eq!(writes[0], (10, BLOCK - 10, false));
        for &(offset, len, bypass) in &writes[1..] {
            assert!(bypass);
            assert_eq!(offset % BLOCK as u64, 0);
            assert_eq!(len % BLOCK, 0);
        }
        assert_eq!(w.buffered(), 0);
        assert_eq!(w.offset(), 3 * BLOCK as u64);
        assert_eq!(w.stats().cached_writes, 2);

        w.close().unwrap();
        assert_eq!(storage.contents(), data);
    }

    #[test]
    fn sync_flushes_then_persists() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"abc").unwrap();
        w.sync().unwrap();

        let ops = storage.ops();
        assert_eq!(
            ops.last(),
            Some(&MemoryOp::Sync(SyncMode::All))
        );
        assert_eq!(storage.contents(), b"abc");
    }

    #[test]
    fn sync_failure_poisons() {
        let (mut w, storage) = writer(BLOCK);
        storage.inject(Fault::Sync);
        assert!(w.sync().is_err());
        assert!(w.is_poisoned());
    }

    #[test]
    fn seek_flushes_staged_bytes_first() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"0123456789").unwrap();

        assert_eq!(w.seek(SeekFrom::Start(0)).unwrap(), 0);
        assert_eq!(w.buffered(), 0);
        assert_eq!(w.offset(), 0);
        assert_eq!(storage.contents(), b"0123456789");

        w.write(b"AB").unwrap();
        w.close().unwrap();
        assert_eq!(storage.contents(), b"AB23456789");
    }

    #[test]
    fn close_releases_handle_even_when_flush_fails() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"lost").unwrap();

        storage.inject(Fault::WriteError(std::io::ErrorKind::Other));
        assert!(matches!(w.close(), Err(IoError::Io { .. })));
        assert!(w.is_closed());
        assert!(w.get_ref().is_none());
        assert!(matches!(w.close(), Err(IoError::AlreadyClosed)));
    }

    #[test]
    fn closed_writer_rejects_everything_without_io() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"tail").unwrap();
        w.close().unwrap();
        let ops_after_close = storage.ops().len();

        assert!(matches!(w.write(b"x"), Err(IoError::AlreadyClosed)));
        assert!(matches!(w.flush(), Err(IoError::AlreadyClosed)));
        assert!(matches!(w.sync(), Err(IoError::AlreadyClosed)));
        assert!(matches!(
            w.seek(SeekFrom::Start(0)),
            Err(IoError::AlreadyClosed)
        ));
        assert_eq!(storage.ops().len(), ops_after_close);
    }

    #[test]
    fn drop_flushes_staged_bytes() {
        let (mut w, storage) = writer(BLOCK);
        w.write(b"on drop").unwrap();
        drop(w);
        assert_eq!(storage.contents(), b"on drop");
    }

    #[test]
    fn construction_requires_bypass() {
        let handle = MemoryHandle::cached(BLOCK);
        assert!(matches!(
            DirectWriter::new(handle, &DirectIoOptions::default()),
            Err(IoError::NotBypassing)
        ));
    }

    #[test]
    fn construction_rejects_alignment_larger_than_block() {
        let handle = MemoryHandle::new(8192);
        assert!(matches!(
            DirectWriter::new(handle, &DirectIoOptions::default()),
            Err(IoError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn appends_continue_from_handle_position() {
        let mut handle = MemoryHandle::with_contents(BLOCK, pattern(BLOCK, 10));
        handle.seek(SeekFrom::End(0)).unwrap();
        let storage = handle.storage();
        let mut w = DirectWriter::new(handle, &DirectIoOptions::default()).unwrap();
        assert_eq!(w.offset(), BLOCK as u64);

        let more = AlignedBuffer::from_data(&pattern(BLOCK, 11), BLOCK);
        w.write(more.as_slice()).unwrap();
        assert_eq!(storage.len(), 2 * BLOCK);
        assert_eq!(&storage.contents()[BLOCK..], more.as_slice());
    }

    #[test]
    fn sector_aligned_offset_inside_a_block_stages_within_the_window() {
        let (mut w, storage) = writer(512);
        w.write(&pattern(1024, 12)).unwrap();
        w.flush().unwrap();
        assert_eq!(w.offset(), 1024);

        // Sector aligned but not block aligned: the direct prefix would leave a
        // tail longer than the distance to the next block boundary.
        let data = AlignedBuffer::from_data(&pattern(8000, 13), BLOCK);
        w.write(data.as_slice()).unwrap();
        assert_eq!(w.offset(), 8192);
        assert_eq!(w.buffered(), 832);
        assert_eq!(w.stats().fast_path_bytes, BLOCK as u64);

        w.write(b"more").unwrap();
        w.close().unwrap();

        let mut expected = pattern(1024, 12);
        expected.extend_from_slice(data.as_slice());
        expected.extend_from_slice(b"more");
        assert_eq!(storage.contents(), expected);
        for (offset, len, bypass) in storage.writes() {
            if bypass {
                assert_eq!(offset % 512, 0);
                assert_eq!(len % 512, 0);
            }
        }
    }

    #[test]
    fn poisoned_error_keeps_the_original_kind() {
        let (mut w, storage) = writer(BLOCK);
        storage.inject(Fault::WriteError(std::io::ErrorKind::StorageFull));
        let first = w.write(&pattern(BLOCK, 14)).unwrap_err();
        assert_eq!(first.kind(), std::io::ErrorKind::StorageFull);

        match w.write(b"x") {
            Err(err @ IoError::Poisoned { .. }) => {
                assert_eq!(err.kind(), std::io::ErrorKind::StorageFull);
            }
            other => panic!("expected poisoned writer, got {other:?}"),
        }
        match w.close() {
            Err(IoError::Poisoned { kind, .. }) => {
                assert_eq!(kind, std::io::ErrorKind::StorageFull);
            }
            other => panic!("expected poisoned close, got {other:?}"),
        }
    }
}
