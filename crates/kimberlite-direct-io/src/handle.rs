//! The bypass-capable handle abstraction.
//!
//! The [`BypassHandle`] trait is the only thing the writer and reader know
//! about the file underneath them. It separates the alignment-aware buffering
//! logic from how a platform actually skips the page cache:
//!
//! - [`ODirectFile`](crate::platform::ODirectFile) on Linux, where bypass is
//!   the `O_DIRECT` status flag and every bypass transfer must be aligned.
//! - [`NoCacheFile`](crate::platform::NoCacheFile) on Apple platforms, where
//!   bypass is the advisory `F_NOCACHE` attribute with no alignment rules.
//! - [`MemoryHandle`](crate::MemoryHandle) for tests and simulation.

use std::io::{Read, Seek, Write};

use crate::IoError;
use crate::options::SyncMode;

/// An open file whose cache-bypass attribute can be read and toggled.
///
/// Plain transfers go through the `std::io` supertraits. Implementations must
/// not retry or split transfers: a short count is reported as-is so the
/// writer can account for it.
pub trait BypassHandle: Read + Write + Seek {
    /// Alignment imposed on bypass transfers, or 0 if bypass is advisory.
    ///
    /// A positive value applies to the buffer address, the file offset and the
    /// transfer length alike.
    fn align_requirement(&self) -> usize;

    /// Reads the current cache-bypass attribute.
    fn query_bypass(&self) -> Result<bool, IoError>;

    /// Sets the cache-bypass attribute.
    fn set_bypass(&mut self, enabled: bool) -> Result<(), IoError>;

    /// Durably persists everything written so far.
    fn sync(&mut self, mode: SyncMode) -> Result<(), IoError>;

    /// Returns the current file length in bytes.
    fn file_len(&self) -> Result<u64, IoError>;
}

impl<H: BypassHandle + ?Sized> BypassHandle for Box<H> {
    fn align_requirement(&self) -> usize {
        (**self).align_requirement()
    }

    fn query_bypass(&self) -> Result<bool, IoError> {
        (**self).query_bypass()
    }

    fn set_bypass(&mut self, enabled: bool) -> Result<(), IoError> {
        (**self).set_bypass(enabled)
    }

    fn sync(&mut self, mode: SyncMode) -> Result<(), IoError> {
        (**self).sync(mode)
    }

    fn file_len(&self) -> Result<u64, IoError> {
        (**self).file_len()
    }
}
