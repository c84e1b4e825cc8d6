//! Apple platforms: cache bypass through the `F_NOCACHE` attribute.
//!
//! The file is opened normally and `F_NOCACHE` is turned on afterwards. The
//! attribute is advisory and imposes no alignment, so the writer always takes
//! its zero-copy path here. There is no `fcntl` to read `F_NOCACHE` back, so
//! the handle remembers the last value it set successfully.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::IoError;
use crate::bypass::sys;
use crate::handle::BypassHandle;
use crate::options::{DirectIoOptions, OpenFlags, SyncMode};

/// A file with `F_NOCACHE` applied after open.
#[derive(Debug)]
pub struct NoCacheFile {
    file: File,
    nocache: bool,
}

impl NoCacheFile {
    /// Opens `path` and turns off data caching for it.
    ///
    /// If the attribute cannot be set the file is closed before the error is
    /// returned.
    pub fn open(
        path: &Path,
        flags: OpenFlags,
        permissions: u32,
        options: &DirectIoOptions,
    ) -> Result<Self, IoError> {
        options.validate()?;
        let open_err = |source| IoError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = flags
            .to_open_options(permissions)
            .open(path)
            .map_err(open_err)?;

        // `file` drops (and closes) on the error path.
        sys::set_nocache(&file, true).map_err(|e| match e {
            IoError::AttributeSet { source, .. } => open_err(source),
            other => other,
        })?;
        tracing::debug!(path = %path.display(), ?flags, "opened file with F_NOCACHE");

        Ok(Self {
            file,
            nocache: true,
        })
    }

    /// Returns the underlying file.
    pub fn file(&self) -> &File {
        &self.file
    }
}

impl BypassHandle for NoCacheFile {
    fn align_requirement(&self) -> usize {
        0
    }

    fn query_bypass(&self) -> Result<bool, IoError> {
        Ok(self.nocache)
    }

    fn set_bypass(&mut self, enabled: bool) -> Result<(), IoError> {
        sys::set_nocache(&self.file, enabled)?;
        self.nocache = enabled;
        Ok(())
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

impl Read for NoCacheFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for NoCacheFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for NoCacheFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
