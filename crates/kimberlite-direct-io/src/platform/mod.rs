//! OS-specific bypass handles.
//!
//! Exactly one of the two implementations is built for a given target and
//! exported as [`PlatformFile`]. The writer and reader only see
//! [`BypassHandle`](crate::BypassHandle).

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::ODirectFile;
/// The bypass handle for the target platform.
#[cfg(target_os = "linux")]
pub type PlatformFile = ODirectFile;

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod apple;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use apple::NoCacheFile;
/// The bypass handle for the target platform.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub type PlatformFile = NoCacheFile;
