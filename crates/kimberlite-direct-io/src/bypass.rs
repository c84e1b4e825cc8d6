//! Cache-bypass attribute control.
//!
//! The free functions here are what the writer calls; platform handles use
//! the `sys` helpers to reach the OS.

use crate::IoError;
use crate::handle::BypassHandle;

/// Reads the handle's cache-bypass attribute.
pub fn query_bypass<H: BypassHandle + ?Sized>(handle: &H) -> Result<bool, IoError> {
    handle.query_bypass()
}

/// Sets the handle's cache-bypass attribute.
pub fn set_bypass<H: BypassHandle + ?Sized>(handle: &mut H, enabled: bool) -> Result<(), IoError> {
    tracing::trace!(enabled, "setting cache-bypass attribute");
    handle.set_bypass(enabled)
}

/// Asserts that the handle was opened with the cache-bypass attribute.
///
/// Returns [`IoError::NotBypassing`] when the attribute is off, which points at
/// the code that opened the handle rather than at the disk. A failing query is
/// reported as [`IoError::AttributeQuery`].
pub fn require_bypass<H: BypassHandle + ?Sized>(handle: &H) -> Result<(), IoError> {
    if query_bypass(handle)? {
        Ok(())
    } else {
        Err(IoError::NotBypassing)
    }
}

#[cfg(target_os = "linux")]
pub(crate) mod sys {
    use std::os::fd::AsFd;

    use rustix::fs::{OFlags, fcntl_getfl, fcntl_setfl};

    use crate::IoError;

    /// Returns whether `O_DIRECT` is set on the descriptor.
    pub(crate) fn o_direct_enabled<Fd: AsFd>(fd: Fd) -> Result<bool, IoError> {
        let flags = fcntl_getfl(fd).map_err(|e| IoError::AttributeQuery { source: e.into() })?;
        Ok(flags.contains(OFlags::DIRECT))
    }

    /// Sets or clears `O_DIRECT` on an open descriptor.
    pub(crate) fn set_o_direct<Fd: AsFd>(fd: Fd, enabled: bool) -> Result<(), IoError> {
        let fd = fd.as_fd();
        let set_err = |e: rustix::io::Errno| IoError::AttributeSet {
            enabled,
            source: e.into(),
        };
        let mut flags = fcntl_getfl(fd).map_err(set_err)?;
        flags.set(OFlags::DIRECT, enabled);
        fcntl_setfl(fd, flags).map_err(set_err)
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub(crate) mod sys {
    use std::os::fd::AsFd;

    use crate::IoError;

    /// Turns `F_NOCACHE` on or off for the descriptor.
    pub(crate) fn set_nocache<Fd: AsFd>(fd: Fd, enabled: bool) -> Result<(), IoError> {
        rustix::fs::fcntl_nocache(fd, enabled).map_err(|e| IoError::AttributeSet {
            enabled,
            source: e.into(),
        })
    }
}
