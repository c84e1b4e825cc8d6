//! # kimberlite-direct-io: Page-Cache-Bypassing File I/O for the WAL
//!
//! This crate lets the write-ahead log append to segment files without going
//! through the operating system's page cache, so a durability sync only has to
//! persist the log's own writes:
//!
//! - **`DirectWriter`**: buffers arbitrarily sized appends into block-aligned
//!   transfers, writing straight from caller memory when it can
//! - **`DirectFile` / `DirectReader`**: write-mode and read-mode files with a
//!   shared `LogFile` surface
//! - **`read_file`**: whole-file reads in aligned blocks
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │        WAL segment writer        │
//! │      (uses DirectFile/LogFile)   │
//! └────────────────┬─────────────────┘
//!                  │
//! ┌────────────────┴─────────────────┐
//! │       kimberlite-direct-io       │
//! │  ┌────────────┐  ┌─────────────┐ │
//! │  │DirectWriter│  │  read_file  │ │
//! │  └─────┬──────┘  └──────┬──────┘ │
//! │        └───BypassHandle─┘        │
//! │  ┌────────┐ ┌────────┐ ┌───────┐ │
//! │  │O_DIRECT│ │NOCACHE │ │Memory │ │
//! │  │ Linux  │ │ Apple  │ │ tests │ │
//! │  └────────┘ └────────┘ └───────┘ │
//! └──────────────────────────────────┘
//! ```
//!
//! # Platforms
//!
//! - Linux: `O_DIRECT`. Bypass transfers must be aligned to the block size in
//!   address, offset and length.
//! - macOS / iOS: `F_NOCACHE`. Advisory, no alignment requirement.
//!
//! On other targets only the handle-generic API is built.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # fn main() -> Result<(), kimberlite_direct_io::IoError> {
//! use kimberlite_direct_io::{OpenFlags, open_writer, read_file};
//!
//! let mut segment = open_writer("segment-0000.wal", OpenFlags::append_create(), 0o644)?;
//! segment.write(b"record")?;
//! segment.sync()?;
//! segment.close()?;
//!
//! assert_eq!(read_file("segment-0000.wal")?, b"record");
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```

mod align;
mod aligned;
mod bypass;
mod error;
mod file;
mod handle;
mod memory;
mod options;
mod platform;
mod reader;
mod writer;

pub use align::{DEFAULT_BLOCK_SIZE, align_down, is_aligned, is_offset_aligned, round_up};
pub use aligned::AlignedBuffer;
pub use bypass::{query_bypass, require_bypass, set_bypass};
pub use error::IoError;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub use file::{open_reader, open_reader_with, open_writer, open_writer_with};
pub use file::{DirectFile, DirectReader, LogFile};
pub use handle::BypassHandle;
pub use memory::{Fault, MemoryHandle, MemoryOp, MemoryStorage};
pub use options::{DirectIoOptions, OpenFlags, SyncMode};
#[cfg(target_os = "linux")]
pub use platform::ODirectFile;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use platform::NoCacheFile;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub use platform::PlatformFile;
pub use reader::read_file_from;
#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
pub use reader::{read_file, read_file_with};
pub use writer::{DirectWriter, WriterStats};
