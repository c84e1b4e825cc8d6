//! Open flags and tuning options for direct I/O files.

use std::fs::OpenOptions;

use serde::{Deserialize, Serialize};

use crate::IoError;
use crate::align::DEFAULT_BLOCK_SIZE;

/// Flags for opening files.
///
/// The cache-bypass attribute is not a flag here: the platform handle always
/// applies it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create the file if it doesn't exist.
    pub create: bool,
    /// Truncate an existing file to zero length.
    pub truncate: bool,
    /// Open in append mode.
    pub append: bool,
}

impl OpenFlags {
    /// Flags for reading an existing file.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Flags for creating or appending to a log segment.
    pub fn append_create() -> Self {
        Self {
            write: true,
            create: true,
            append: true,
            ..Self::default()
        }
    }

    /// Flags for creating a fresh segment, discarding any previous contents.
    pub fn create_truncate() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Self::default()
        }
    }

    /// Translates the flags into `std` open options with the given Unix mode.
    pub(crate) fn to_open_options(self, permissions: u32) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.read(self.read)
            .write(self.write)
            .create(self.create)
            .truncate(self.truncate)
            .append(self.append);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(permissions);
        }
        #[cfg(not(unix))]
        let _ = permissions;

        opts
    }
}

/// Durability primitive used by `sync`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Persist data and metadata (`fsync`).
    #[default]
    All,
    /// Persist data and the metadata needed to read it back (`fdatasync`).
    Data,
}

/// Tuning for the direct I/O writer and reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectIoOptions {
    /// Transfer granularity and staging buffer size. Must be a power of two.
    pub block_size: usize,
    /// Alignment to enforce on bypass transfers.
    ///
    /// `None` uses the handle's own requirement. A value can raise, but never
    /// lower, what the handle requires.
    pub align_requirement: Option<usize>,
    /// Durability primitive issued by `sync`.
    pub sync_mode: SyncMode,
}

impl Default for DirectIoOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            align_requirement: None,
            sync_mode: SyncMode::All,
        }
    }
}

impl DirectIoOptions {
    /// Checks that the options describe a usable configuration.
    pub fn validate(&self) -> Result<(), IoError> {
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(IoError::InvalidOptions {
                reason: format!(
                    "block size must be a positive power of two, got {}",
                    self.block_size
                ),
            });
        }
        if let Some(align) = self.align_requirement {
            check_alignment(align, self.block_size)?;
        }
        Ok(())
    }

    /// Combines the handle's alignment requirement with the configured one.
    pub(crate) fn effective_alignment(&self, handle_align: usize) -> Result<usize, IoError> {
        let align = handle_align.max(self.align_requirement.unwrap_or(0));
        check_alignment(align, self.block_size)?;
        Ok(align)
    }
}

fn check_alignment(align: usize, block_size: usize) -> Result<(), IoError> {
    if align == 0 {
        return Ok(());
    }
    if !align.is_power_of_two() || block_size % align != 0 {
        return Err(IoError::InvalidOptions {
            reason: format!(
                "alignment {align} must be a power of two dividing the block size {block_size}"
            ),
        });
    }
    Ok(())
}
