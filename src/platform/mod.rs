//! Host platform detection and the OS collaborators used by the engine

pub mod command;
pub mod fs;
pub mod registry;
pub mod traits;
#[cfg(windows)]
pub mod win32;

pub use command::SystemCommandRunner;
pub use fs::StdFileSystem;
pub use traits::*;

use crate::error::ReclaimError;

/// Returns the current platform name
pub fn platform_name() -> &'static str {
    std::env::consts::OS
}

/// Check if the current platform is supported
pub fn is_platform_supported() -> bool {
    cfg!(windows)
}

/// Fail with [`ReclaimError::UnsupportedPlatform`] on anything but Windows.
pub fn ensure_supported_platform() -> Result<(), ReclaimError> {
    if is_platform_supported() {
        Ok(())
    } else {
        Err(ReclaimError::UnsupportedPlatform {
            os: platform_name().to_string(),
        })
    }
}
