//! Write-mode and read-mode files over a bypass handle.
//!
//! [`DirectFile`] appends through a [`DirectWriter`]; [`DirectReader`] hands
//! reads straight to the handle. Both implement [`LogFile`], the uniform
//! capability surface the WAL segment code is written against, where the
//! operation the mode lacks fails with [`IoError::UnsupportedOperation`].

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
use std::io::Seek;
use std::io::SeekFrom;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
use std::path::Path;

use crate::IoError;
use crate::bypass::require_bypass;
use crate::handle::BypassHandle;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
use crate::options::OpenFlags;
use crate::options::DirectIoOptions;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
use crate::platform::PlatformFile;
use crate::writer::{DirectWriter, WriterStats};

/// File operations shared by write-mode and read-mode files.
pub trait LogFile {
    /// Appends `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, IoError>;

    /// Reads into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Moves the file position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError>;

    /// Makes everything written so far durable.
    fn sync(&mut self) -> Result<(), IoError>;

    /// Releases the file. Later operations fail with [`IoError::AlreadyClosed`].
    fn close(&mut self) -> Result<(), IoError>;
}

/// A write-mode file that bypasses the page cache.
#[derive(Debug)]
pub struct DirectFile<H: BypassHandle> {
    writer: DirectWriter<H>,
}

impl<H: BypassHandle> DirectFile<H> {
    /// Wraps a handle that was opened with the cache-bypass attribute.
    ///
    /// On error the handle has already been dropped.
    pub fn from_handle(handle: H, options: &DirectIoOptions) -> Result<Self, IoError> {
        Ok(Self {
            writer: DirectWriter::new(handle, options)?,
        })
    }

    /// Appends `data`. See [`DirectWriter::write`].
    pub fn write(&mut self, data: &[u8]) -> Result<usize, IoError> {
        self.writer.write(data)
    }

    /// Delivers buffered bytes to the handle without syncing.
    pub fn flush(&mut self) -> Result<(), IoError> {
        self.writer.flush()
    }

    /// Flushes and makes the file durable.
    pub fn sync(&mut self) -> Result<(), IoError> {
        self.writer.sync()
    }

    /// Flushes, then moves the file position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        self.writer.seek(pos)
    }

    /// Flushes and releases the handle, reporting any flush error.
    pub fn close(&mut self) -> Result<(), IoError> {
        self.writer.close()
    }

    /// Returns the number of bytes accepted but not yet delivered.
    pub fn buffered(&self) -> usize {
        self.writer.buffered()
    }

    /// Returns the file position the next delivered byte lands at.
    pub fn offset(&self) -> u64 {
        self.writer.offset()
    }

    /// Returns the writer's transfer counters.
    pub fn stats(&self) -> WriterStats {
        self.writer.stats()
    }

    /// Returns true after [`Self::close`].
    pub fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }

    /// Returns the underlying writer.
    pub fn writer(&self) -> &DirectWriter<H> {
        &self.writer
    }
}

impl<H: BypassHandle> LogFile for DirectFile<H> {
    fn write(&mut self, data: &[u8]) -> Result<usize, IoError> {
        self.writer.write(data)
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, IoError> {
        Err(IoError::UnsupportedOperation { operation: "read" })
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        self.writer.seek(pos)
    }

    fn sync(&mut self) -> Result<(), IoError> {
        self.writer.sync()
    }

    fn close(&mut self) -> Result<(), IoError> {
        self.writer.close()
    }
}

/// A read-mode file that bypasses the page cache.
///
/// Reads are passed through unbuffered. Under a flag-based bypass the caller
/// must supply block-aligned, block-sized buffers at block-aligned positions.
#[derive(Debug)]
pub struct DirectReader<H: BypassHandle> {
    handle: Option<H>,
}

impl<H: BypassHandle> DirectReader<H> {
    /// Wraps a handle that was opened with the cache-bypass attribute.
    pub fn from_handle(handle: H) -> Result<Self, IoError> {
        require_bypass(&handle)?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Reads into `buf` at the current position.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        Ok(self.handle_mut()?.read(buf)?)
    }

    /// Moves the read position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        Ok(self.handle_mut()?.seek(pos)?)
    }

    /// Returns the current file length.
    pub fn file_len(&self) -> Result<u64, IoError> {
        self.handle.as_ref().ok_or(IoError::AlreadyClosed)?.file_len()
    }

    /// Returns the alignment the handle imposes on reads.
    pub fn align_requirement(&self) -> Result<usize, IoError> {
        Ok(self
            .handle
            .as_ref()
            .ok_or(IoError::AlreadyClosed)?
            .align_requirement())
    }

    /// Releases the handle.
    pub fn close(&mut self) -> Result<(), IoError> {
        drop(self.handle.take().ok_or(IoError::AlreadyClosed)?);
        tracing::debug!("closed direct reader");
        Ok(())
    }

    /// Returns true after [`Self::close`].
    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn handle_mut(&mut self) -> Result<&mut H, IoError> {
        self.handle.as_mut().ok_or(IoError::AlreadyClosed)
    }
}

impl<H: BypassHandle> LogFile for DirectReader<H> {
    fn write(&mut self, _data: &[u8]) -> Result<usize, IoError> {
        Err(IoError::UnsupportedOperation { operation: "write" })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        DirectReader::read(self, buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        DirectReader::seek(self, pos)
    }

    fn sync(&mut self) -> Result<(), IoError> {
        Err(IoError::UnsupportedOperation { operation: "sync" })
    }

    fn close(&mut self) -> Result<(), IoError> {
        DirectReader::close(self)
    }
}

/// Opens `path` for cache-bypassing appends with default options.
///
/// `permissions` is the Unix mode applied if the file is created.
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub fn open_writer(
    path: impl AsRef<Path>,
    flags: OpenFlags,
    permissions: u32,
) -> Result<DirectFile<PlatformFile>, IoError> {
    open_writer_with(path, flags, permissions, &DirectIoOptions::default())
}

/// Opens `path` for cache-bypassing appends.
///
/// With `flags.append` the writer starts at the end of the existing file. Any
/// descriptor opened along the way is closed before an error is returned.
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub fn open_writer_with(
    path: impl AsRef<Path>,
    flags: OpenFlags,
    permissions: u32,
    options: &DirectIoOptions,
) -> Result<DirectFile<PlatformFile>, IoError> {
    let path = path.as_ref();
    let mut handle = PlatformFile::open(path, flags, permissions, options)?;
    if flags.append {
        handle.seek(SeekFrom::End(0))?;
    }
    DirectFile::from_handle(handle, options)
}

/// Opens `path` for cache-bypassing reads with default options.
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub fn open_reader(
    path: impl AsRef<Path>,
    flags: OpenFlags,
    permissions: u32,
) -> Result<DirectReader<PlatformFile>, IoError> {
    open_reader_with(path, flags, permissions, &DirectIoOptions::default())
}

/// Opens `path` for cache-bypassing reads.
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub fn open_reader_with(
    path: impl AsRef<Path>,
    flags: OpenFlags,
    permissions: u32,
    options: &DirectIoOptions,
) -> Result<DirectReader<PlatformFile>, IoError> {
    let handle = PlatformFile::open(path.as_ref(), flags, permissions, options)?;
    DirectReader::from_handle(handle)
}
