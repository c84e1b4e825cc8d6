//! Linux: cache bypass through the `O_DIRECT` status flag.
//!
//! The flag is requested at open time and toggled afterwards with
//! `fcntl(F_SETFL)`. While it is set, the kernel rejects transfers whose
//! buffer address, file offset or length is not a multiple of the logical
//! block size, so this handle reports the configured block size as its
//! alignment requirement.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::IoError;
use crate::bypass::sys;
use crate::handle::BypassHandle;
use crate::options::{DirectIoOptions, OpenFlags, SyncMode};

/// A file opened with `O_DIRECT`.
#[derive(Debug)]
pub struct ODirectFile {
    file: File,
    align: usize,
}

impl ODirectFile {
    /// Opens `path` with `O_DIRECT` set.
    ///
    /// Filesystems without direct I/O support fail here with
    /// [`IoError::Open`] (`EINVAL`).
    pub fn open(
        path: &Path,
        flags: OpenFlags,
        permissions: u32,
        options: &DirectIoOptions,
    ) -> Result<Self, IoError> {
        options.validate()?;
        let file = flags
            .to_open_options(permissions)
            .custom_flags(libc::O_DIRECT)
            .open(path)
            .map_err(|source| IoError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), ?flags, "opened file with O_DIRECT");

        Ok(Self {
            file,
            align: options.block_size,
        })
    }

    /// Returns the underlying file.
    pub fn file(&self) -> &File {
        &self.file
    }
}

impl BypassHandle for ODirectFile {
    fn align_requirement(&self) -> usize {
        self.align
    }

    fn query_bypass(&self) -> Result<bool, IoError> {
        sys::o_direct_enabled(&self.file)
    }

    fn set_bypass(&mut self, enabled: bool) -> Result<(), IoError> {
        sys::set_o_direct(&self.file, enabled)
    }

    fn sync(&mut self, mode: SyncMode) -> Result<(), IoError> {
        match mode {
            SyncMode::All => self.file.sync_all()?,
            SyncMode::Data => self.file.sync_data()?,
        }
        Ok(())
    }

    fn file_len(&self) -> Result<u64, IoError> {
        Ok(self.file.metadata()?.len())
    }
}

impl Read for ODirectFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for ODirectFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for ODirectFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
