//! In-memory bypass handle with fault injection.
//!
//! [`MemoryHandle`] behaves like a flag-based bypass file: while bypass is on
//! and the alignment requirement is positive, any transfer whose buffer
//! address, file offset or length is misaligned fails with
//! `ErrorKind::InvalidInput`, as `O_DIRECT` does with `EINVAL`. Every
//! completed operation is recorded, and queued [`Fault`]s make the next
//! matching operation fail or come up short.
//!
//! The bytes and the operation log live behind an `Arc<Mutex<_>>`, so a
//! [`MemoryStorage`] view obtained before the handle is moved into a writer
//! can still inspect it afterwards.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::IoError;
use crate::align::{is_aligned, is_offset_aligned};
use crate::handle::BypassHandle;
use crate::options::SyncMode;

/// A failure to inject into the next matching operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The next write transfers at most this many bytes.
    ShortWrite(usize),
    /// The next write fails with this error kind.
    WriteError(io::ErrorKind),
    /// The next read fails with this error kind.
    ReadError(io::ErrorKind),
    /// The next attribute query fails.
    QueryBypass,
    /// The next attribute change fails, whichever way it goes.
    SetBypass,
    /// The next attribute change that turns bypass back on fails.
    EnableBypass,
    /// The next sync fails.
    Sync,
}

/// A completed operation, as recorded by the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    /// Bytes transferred at `offset`, with the bypass attribute as it was.
    Write {
        offset: u64,
        len: usize,
        bypass: bool,
    },
    /// Bytes read at `offset`.
    Read { offset: u64, len: usize },
    /// The bypass attribute was changed.
    SetBypass(bool),
    /// The position was moved.
    Seek(u64),
    /// A durability sync.
    Sync(SyncMode),
}

#[derive(Debug, Default)]
struct MemoryState {
    data: Vec<u8>,
    cursor: u64,
    bypass: bool,
    align: usize,
    ops: Vec<MemoryOp>,
    faults: VecDeque<Fault>,
}

impl MemoryState {
    /// Removes and returns the first queued fault accepted by `matches`.
    fn take_fault(&mut self, matches: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let index = self.faults.iter().position(matches)?;
        self.faults.remove(index)
    }

    fn check_transfer(&self, ptr: *const u8, len: usize) -> io::Result<()> {
        if !self.bypass || self.align == 0 {
            return Ok(());
        }
        if is_aligned(ptr, self.align)
            && len % self.align == 0
            && is_offset_aligned(self.cursor, self.align)
        {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "misaligned bypass transfer: {len} bytes at offset {} (alignment {})",
                    self.cursor, self.align
                ),
            ))
        }
    }
}

/// A [`BypassHandle`] backed by memory.
#[derive(Debug)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHandle {
    /// Creates an empty handle in bypass mode.
    ///
    /// `align` is the alignment enforced on bypass transfers; 0 makes bypass
    /// advisory.
    pub fn new(align: usize) -> Self {
        Self::with_contents(align, Vec::new())
    }

    /// Creates an empty handle that was "opened" without bypass.
    pub fn cached(align: usize) -> Self {
        let handle = Self::new(align);
        handle.lock().bypass = false;
        handle
    }

    /// Creates a handle in bypass mode holding `data`, positioned at 0.
    pub fn with_contents(align: usize, data: Vec<u8>) -> Self {
        let state = MemoryState {
            data,
            bypass: true,
            align,
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Returns a view that stays valid after the handle is moved or dropped.
    pub fn storage(&self) -> MemoryStorage {
        MemoryStorage {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Inspection and fault-injection view of a [`MemoryHandle`].
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    /// Returns a copy of the stored bytes.
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.state).data.clone()
    }

    /// Returns the stored length.
    pub fn len(&self) -> usize {
        lock(&self.state).data.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current bypass attribute.
    pub fn bypass(&self) -> bool {
        lock(&self.state).bypass
    }

    /// Returns every recorded operation, oldest first.
    pub fn ops(&self) -> Vec<MemoryOp> {
        lock(&self.state).ops.clone()
    }

    /// Returns the recorded writes as `(offset, len, bypass)`.
    pub fn writes(&self) -> Vec<(u64, usize, bool)> {
        lock(&self.state)
            .ops
            .iter()
            .filter_map(|op| match *op {
                MemoryOp::Write {
                    offset,
                    len,
                    bypass,
                } => Some((offset, len, bypass)),
                _ => None,
            })
            .collect()
    }

    /// Forgets the recorded operations.
    pub fn clear_ops(&self) {
        lock(&self.state).ops.clear();
    }

    /// Queues a fault for the next matching operation.
    pub fn inject(&self, fault: Fault) {
        lock(&self.state).faults.push_back(fault);
    }
}

impl BypassHandle for MemoryHandle {
    fn align_requirement(&self) -> usize {
        self.lock().align
    }

    fn query_bypass(&self) -> Result<bool, IoError> {
        let mut state = self.lock();
        if state.take_fault(|f| *f == Fault::QueryBypass).is_some() {
            return Err(IoError::AttributeQuery {
                source: io::Error::other("injected attribute query failure"),
            });
        }
        Ok(state.bypass)
    }

    fn set_bypass(&mut self, enabled: bool) -> Result<(), IoError> {
        let mut state = self.lock();
        let fault = state.take_fault(|f| match f {
            Fault::SetBypass => true,
            Fault::EnableBypass => enabled,
            _ => false,
        });
        if fault.is_some() {
            return Err(IoError::AttributeSet {
                enabled,
                source: io::Error::other("injected attribute set failure"),
            });
        }
        state.bypass = enabled;
        state.ops.push(MemoryOp::SetBypass(enabled));
        Ok(())
    }

    fn sync(&mut self, mode: SyncMode) -> Result<(), IoError> {
        let mut state = self.lock();
        if state.take_fault(|f| *f == Fault::Sync).is_some() {
            return Err(io::Error::other("injected sync failure").into());
        }
        state.ops.push(MemoryOp::Sync(mode));
        Ok(())
    }

    fn file_len(&self) -> Result<u64, IoError> {
        Ok(self.lock().data.len() as u64)
    }
}

impl Write for MemoryHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        let fault =
            state.take_fault(|f| matches!(f, Fault::ShortWrite(_) | Fault::WriteError(_)));
        if let Some(Fault::WriteError(kind)) = fault {
            return Err(io::Error::new(kind, "injected write failure"));
        }
        state.check_transfer(buf.as_ptr(), buf.len())?;

        let n = match fault {
            Some(Fault::ShortWrite(limit)) => buf.len().min(limit),
            _ => buf.len(),
        };
        let offset = state.cursor;
        let start = offset as usize;
        let end = start + n;
        if state.data.len() < end {
            state.data.resize(end, 0);
        }
        state.data[start..end].copy_from_slice(&buf[..n]);
        state.cursor = end as u64;

        let bypass = state.bypass;
        state.ops.push(MemoryOp::Write {
            offset,
            len: n,
            bypass,
        });
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if let Some(Fault::ReadError(kind)) =
            state.take_fault(|f| matches!(f, Fault::ReadError(_)))
        {
            return Err(io::Error::new(kind, "injected read failure"));
        }
        state.check_transfer(buf.as_ptr(), buf.len())?;

        let offset = state.cursor;
        let start = (offset as usize).min(state.data.len());
        let n = buf.len().min(state.data.len() - start);
        buf[..n].copy_from_slice(&state.data[start..start + n]);
        state.cursor = offset + n as u64;
        state.ops.push(MemoryOp::Read { offset, len: n });
        Ok(n)
    }
}

impl Seek for MemoryHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut state = self.lock();
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => (state.data.len() as u64).checked_add_signed(delta),
            SeekFrom::Current(delta) => state.cursor.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        state.cursor = target;
        state.ops.push(MemoryOp::Seek(target));
        Ok(target)
    }
}
