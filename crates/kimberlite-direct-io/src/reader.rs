//! Whole-file reads through a bypass handle.

use std::io::{self, SeekFrom};
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
use std::path::Path;

use crate::IoError;
use crate::align::round_up;
use crate::aligned::AlignedBuffer;
use crate::handle::BypassHandle;
use crate::options::DirectIoOptions;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
use crate::options::OpenFlags;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
use crate::platform::PlatformFile;

/// Reads the whole file at `path`, bypassing the page cache.
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, IoError> {
    read_file_with(path, &DirectIoOptions::default())
}

/// Reads the whole file at `path` in `options.block_size` reads.
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub fn read_file_with(
    path: impl AsRef<Path>,
    options: &DirectIoOptions,
) -> Result<Vec<u8>, IoError> {
    let path = path.as_ref();
    let handle = PlatformFile::open(path, OpenFlags::read_only(), 0, options)?;
    let data = read_file_from(handle, options.block_size)?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "read file");
    Ok(data)
}

/// Reads everything from the start of `handle` in block-sized reads.
///
/// Every read targets a block-aligned buffer at a block-aligned offset. The
/// first read that returns less than a full block is end of file, so at most
/// `ceil(len / block_size) + 1` reads are issued, with `len` taken from the
/// handle before the first one. Bytes appended concurrently past that bound
/// are not returned.
pub fn read_file_from<H: BypassHandle>(
    mut handle: H,
    block_size: usize,
) -> Result<Vec<u8>, IoError> {
    DirectIoOptions {
        block_size,
        ..DirectIoOptions::default()
    }
    .validate()?;

    let len = usize::try_from(handle.file_len()?).map_err(|_| {
        io::Error::new(
            io::ErrorKind::FileTooLarge,
            "file does not fit in addressable memory",
        )
    })?;
    let max_reads = len.div_ceil(block_size) + 1;

    handle.seek(SeekFrom::Start(0))?;
    let mut block = AlignedBuffer::new(block_size, block_size);
    let mut out = Vec::with_capacity(round_up(len, block_size));

    for _ in 0..max_reads {
        let n = handle.read(block.as_mut_capacity())?;
        block.set_len(n);
        out.extend_from_slice(block.as_slice());
        if n < block_size {
            break;
        }
    }

    Ok(out)
}
