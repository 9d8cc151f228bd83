//! Operating-system collaborator traits
//!
//! The reclamation steps never talk to the OS directly. They go through the
//! narrow interfaces below so that every sub-target operation can be isolated,
//! counted and replaced by a test double.
//!
//! ```text
//! +--------------------+
//! | Reclamation steps  |
//! +--------------------+
//!           |
//!   +-------+--------+----------+-----------+
//!   |       |        |          |           |
//! +-v--+ +--v---+ +--v----+ +---v----+ +----v----+
//! | FS | | Cmd  | | Proc  | | Service| | Registry|
//! +----+ +------+ +-------+ +--------+ +---------+
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Error Types
// ============================================================================

/// Failure of a single OS call on a single sub-target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OsError {
    /// Caller lacks the rights for this object
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// Object does not exist (exited process, missing service, absent key)
    #[error("not found: {0}")]
    NotFound(String),
    /// System call failed with an OS error code
    #[error("system error ({code}): {message}")]
    System { code: i32, message: String },
    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for OsError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => OsError::AccessDenied(err.to_string()),
            std::io::ErrorKind::NotFound => OsError::NotFound(err.to_string()),
            _ => match err.raw_os_error() {
                Some(code) => OsError::System {
                    code,
                    message: err.to_string(),
                },
                None => OsError::Io(err.to_string()),
            },
        }
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// One immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// Full path of the entry
    pub path: PathBuf,
    /// True for real directories; symlinks are reported as files
    pub is_dir: bool,
}

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Immediate children of `path`, not recursive.
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>, OsError>;

    fn remove_file(&self, path: &Path) -> Result<(), OsError>;

    fn remove_dir_all(&self, path: &Path) -> Result<(), OsError>;
}

// ============================================================================
// External commands
// ============================================================================

/// Captured result of an external tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// First meaningful line of output, preferring stderr.
    pub fn summary(&self) -> Option<String> {
        [&self.stderr, &self.stdout]
            .into_iter()
            .flat_map(|text| text.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion, capturing its output.
    fn run(&self, program: &Path, args: &[&str]) -> Result<CommandOutput, OsError>;
}

// ============================================================================
// Processes
// ============================================================================

/// An open process handle with the rights needed to trim its working set.
///
/// Implementations release the underlying OS handle in `Drop`, so a handle
/// never outlives the scope of the per-process attempt that opened it.
pub trait TrimHandle {
    /// Ask the OS to page out the process's resident pages.
    fn trim(&self) -> Result<(), OsError>;
}

pub trait ProcessControl: Send + Sync {
    /// Open `pid` with the minimal rights required by [`TrimHandle::trim`].
    fn open_for_trim(&self, pid: u32) -> Result<Box<dyn TrimHandle + '_>, OsError>;
}

// ============================================================================
// Services
// ============================================================================

/// Coarse run state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceRunState {
    Stopped,
    Running,
    /// Start, stop, continue or pause in progress
    Pending,
    Paused,
}

impl fmt::Display for ServiceRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceRunState::Stopped => write!(f, "stopped"),
            ServiceRunState::Running => write!(f, "running"),
            ServiceRunState::Pending => write!(f, "pending"),
            ServiceRunState::Paused => write!(f, "paused"),
        }
    }
}

pub trait ServiceControl: Send + Sync {
    fn query_state(&self, name: &str) -> Result<ServiceRunState, OsError>;

    /// Request a stop. Does not wait for the service to reach `Stopped`.
    fn stop(&self, name: &str) -> Result<(), OsError>;
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryHive {
    LocalMachine,
    CurrentUser,
}

impl RegistryHive {
    /// Short hive prefix, as in `HKLM\Software`.
    pub fn prefix(&self) -> &'static str {
        match self {
            RegistryHive::LocalMachine => "HKLM",
            RegistryHive::CurrentUser => "HKCU",
        }
    }

    /// Machine-wide keys need elevation to be read reliably.
    pub fn is_machine_scope(&self) -> bool {
        matches!(self, RegistryHive::LocalMachine)
    }
}

/// A registry key whose values are enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryLocation {
    pub hive: RegistryHive,
    /// Key path below the hive, backslash separated
    pub path: String,
}

impl RegistryLocation {
    pub fn new(hive: RegistryHive, path: impl Into<String>) -> Self {
        Self {
            hive,
            path: path.into(),
        }
    }
}

impl fmt::Display for RegistryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.hive.prefix(), self.path)
    }
}

/// A string value under a registry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryValue {
    pub name: String,
    pub data: String,
}

pub trait RegistryReader: Send + Sync {
    fn read_values(&self, location: &RegistryLocation) -> Result<Vec<RegistryValue>, OsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(OsError::from(denied), OsError::AccessDenied(_)));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(OsError::from(missing), OsError::NotFound(_)));

        let raw = std::io::Error::from_raw_os_error(32);
        match OsError::from(raw) {
            OsError::System { code, .. } => assert_eq!(code, 32),
            // Some platforms map 32 to a specific kind
            OsError::AccessDenied(_) | OsError::NotFound(_) | OsError::Io(_) => {}
        }
    }

    #[test]
    fn test_command_summary_prefers_stderr() {
        let output = CommandOutput {
            success: false,
            code: Some(1),
            stdout: "\nsome stdout\n".into(),
            stderr: "  \n  the real problem  \n".into(),
        };
        assert_eq!(output.summary().as_deref(), Some("the real problem"));

        let quiet = CommandOutput::default();
        assert_eq!(quiet.summary(), None);
    }

    #[test]
    fn test_registry_location_display() {
        let location = RegistryLocation::new(
            RegistryHive::CurrentUser,
            r"Software\Microsoft\Windows\CurrentVersion\Run",
        );
        assert_eq!(
            location.to_string(),
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run"
        );
        assert!(!location.hive.is_machine_scope());
        assert!(RegistryHive::LocalMachine.is_machine_scope());
    }
}
