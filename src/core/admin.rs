//! Process-wide privilege context

use tracing::{info, warn};

/// Whether the running process holds administrative rights.
///
/// Detected once at startup and passed by value to everything that gates a
/// privileged operation. Never re-queried afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminContext {
    is_elevated: bool,
}

impl AdminContext {
    pub fn new(is_elevated: bool) -> Self {
        Self { is_elevated }
    }

    /// Query the current process token.
    pub fn detect() -> Self {
        let is_elevated = check_elevation();
        if is_elevated {
            info!("Running with administrator privileges");
        } else {
            warn!("Running without administrator privileges - some steps will be skipped");
        }
        Self { is_elevated }
    }

    pub fn is_elevated(&self) -> bool {
        self.is_elevated
    }
}

fn check_elevation() -> bool {
    #[cfg(windows)]
    {
        use std::mem::{size_of, MaybeUninit};
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::Security::{
            GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
        };
        use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

        unsafe {
            let mut token = MaybeUninit::uninit();
            if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, token.as_mut_ptr()).is_err() {
                return false;
            }
            let token = token.assume_init();

            let mut elevation = TOKEN_ELEVATION::default();
            let mut size = 0u32;
            let result = GetTokenInformation(
                token,
                TokenElevation,
                Some(&mut elevation as *mut _ as *mut _),
                size_of::<TOKEN_ELEVATION>() as u32,
                &mut size,
            );
            let _ = CloseHandle(token);
            result.is_ok() && elevation.TokenIsElevated != 0
        }
    }
    #[cfg(not(windows))]
    {
        false
    }
}
