//! Direct I/O error types.

use std::path::PathBuf;

/// Errors from the direct I/O layer.
///
/// Nothing here is retried internally. [`IoError::ShortWrite`] returned by a
/// flush is the only recoverable condition: the unwritten bytes stay buffered
/// and the next flush retries them.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Underlying OS I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The file could not be opened or configured for bypass I/O.
    #[error("failed to open {path} for direct I/O: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The handle was not opened with the cache-bypass attribute.
    #[error("handle is not in cache-bypass mode")]
    NotBypassing,

    /// Reading the cache-bypass attribute failed.
    #[error("failed to query cache-bypass attribute: {source}")]
    AttributeQuery { source: std::io::Error },

    /// Setting the cache-bypass attribute failed.
    #[error("failed to set cache-bypass attribute to {enabled}: {source}")]
    AttributeSet {
        enabled: bool,
        source: std::io::Error,
    },

    /// Fewer bytes reached the handle than were requested.
    #[error("short write: {written} of {requested} bytes written")]
    ShortWrite { requested: usize, written: usize },

    /// Operation on a closed file.
    #[error("file already closed")]
    AlreadyClosed,

    /// Operation not offered by this mode of file.
    #[error("operation not supported: {operation}")]
    UnsupportedOperation { operation: &'static str },

    /// The writer hit a fatal error earlier and accepts no further I/O.
    ///
    /// `kind` is the [`IoError::kind`] of that first error.
    #[error("writer failed permanently: {cause}")]
    Poisoned {
        kind: std::io::ErrorKind,
        cause: String,
    },

    /// Options that cannot describe a legal bypass configuration.
    #[error("invalid direct I/O options: {reason}")]
    InvalidOptions { reason: String },
}

impl IoError {
    /// Returns the `std::io::ErrorKind` that best describes this error.
    ///
    /// OS failures keep the kind of their source, so a poisoned writer still
    /// tells a full disk (`StorageFull`) apart from a failing device.
    pub fn kind(&self) -> std::io::ErrorKind {
        use std::io::ErrorKind;

        match self {
            Self::Io { source }
            | Self::Open { source, .. }
            | Self::AttributeQuery { source }
            | Self::AttributeSet { source, .. } => source.kind(),
            Self::ShortWrite { .. } => ErrorKind::WriteZero,
            Self::Poisoned { kind, .. } => *kind,
            Self::NotBypassing | Self::InvalidOptions { .. } => ErrorKind::InvalidInput,
            Self::UnsupportedOperation { .. } => ErrorKind::Unsupported,
            Self::AlreadyClosed => ErrorKind::NotConnected,
        }
    }
}
