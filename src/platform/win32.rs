//! Win32 implementations of the privileged collaborators

use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    CloseHandle, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS, HANDLE, WIN32_ERROR,
};
use windows::Win32::System::ProcessStatus::EmptyWorkingSet;
use windows::Win32::System::Registry::{
    RegCloseKey, RegEnumValueW, RegOpenKeyExW, HKEY, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    KEY_READ,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_SET_QUOTA,
};
use windows_service::service::{ServiceAccess, ServiceState};
use windows_service::service_manager::{ServiceManager, ServiceManagerAccess};

use super::registry::{registry_error, string_value};
use super::traits::{
    OsError, ProcessControl, RegistryHive, RegistryLocation, RegistryReader, RegistryValue,
    ServiceControl, ServiceRunState, TrimHandle,
};

const E_ACCESSDENIED: u32 = 0x8007_0005;
const E_INVALIDARG_WIN32: u32 = 0x8007_0057;
const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;

fn win_error(context: &str, err: windows::core::Error) -> OsError {
    let message = format!("{}: {}", context, err);
    match err.code().0 as u32 {
        E_ACCESSDENIED => OsError::AccessDenied(message),
        // OpenProcess reports an exited PID as an invalid parameter
        E_INVALIDARG_WIN32 => OsError::NotFound(message),
        code => OsError::System {
            code: code as i32,
            message,
        },
    }
}

// ============================================================================
// Processes
// ============================================================================

/// Owned process handle, closed on drop.
struct ProcessHandle {
    pid: u32,
    handle: HANDLE,
}

impl TrimHandle for ProcessHandle {
    fn trim(&self) -> Result<(), OsError> {
        unsafe { EmptyWorkingSet(self.handle) }
            .map_err(|e| win_error(&format!("EmptyWorkingSet({})", self.pid), e))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let _ = unsafe { CloseHandle(self.handle) };
    }
}

/// [`ProcessControl`] using `OpenProcess` + `EmptyWorkingSet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32ProcessControl;

impl ProcessControl for Win32ProcessControl {
    fn open_for_trim(&self, pid: u32) -> Result<Box<dyn TrimHandle + '_>, OsError> {
        let handle = unsafe {
            OpenProcess(
                PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_SET_QUOTA,
                false,
                pid,
            )
        }
        .map_err(|e| win_error(&format!("OpenProcess({})", pid), e))?;
        Ok(Box::new(ProcessHandle { pid, handle }))
    }
}

// ============================================================================
// Services
// ============================================================================

fn service_error(name: &str, err: windows_service::Error) -> OsError {
    match err {
        windows_service::Error::Winapi(io) => {
            if io.raw_os_error() == Some(ERROR_SERVICE_DOES_NOT_EXIST) {
                OsError::NotFound(format!("service {}", name))
            } else {
                OsError::from(io)
            }
        }
        other => OsError::Io(format!("service {}: {}", name, other)),
    }
}

/// [`ServiceControl`] backed by the service control manager.
///
/// The manager and service handles are opened per call and closed when they
/// go out of scope, so none outlives the query or stop it was opened for.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScmServiceControl;

impl ScmServiceControl {
    fn connect(name: &str) -> Result<ServiceManager, OsError> {
        ServiceManager::local_computer(None::<&str>, ServiceManagerAccess::CONNECT)
            .map_err(|e| service_error(name, e))
    }
}

impl ServiceControl for ScmServiceControl {
    fn query_state(&self, name: &str) -> Result<ServiceRunState, OsError> {
        let manager = Self::connect(name)?;
        let service = manager
            .open_service(name, ServiceAccess::QUERY_STATUS)
            .map_err(|e| service_error(name, e))?;
        let status = service.query_status().map_err(|e| service_error(name, e))?;

        Ok(match status.current_state {
            ServiceState::Running => ServiceRunState::Running,
            ServiceState::Stopped => ServiceRunState::Stopped,
            ServiceState::Paused => ServiceRunState::Paused,
            ServiceState::StartPending
            | ServiceState::StopPending
            | ServiceState::ContinuePending
            | ServiceState::PausePending => ServiceRunState::Pending,
        })
    }

    fn stop(&self, name: &str) -> Result<(), OsError> {
        let manager = Self::connect(name)?;
        let service = manager
            .open_service(name, ServiceAccess::STOP)
            .map_err(|e| service_error(name, e))?;
        service.stop().map_err(|e| service_error(name, e))?;
        Ok(())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Longest value name the registry allows, plus the terminator.
const MAX_VALUE_NAME: usize = 16_384;
const INITIAL_DATA_BYTES: usize = 4_096;

/// Open key, closed on drop.
struct KeyHandle(HKEY);

impl Drop for KeyHandle {
    fn drop(&mut self) {
        let _ = unsafe { RegCloseKey(self.0) };
    }
}

fn check(status: WIN32_ERROR, key: &str) -> Result<(), OsError> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(registry_error(status.0, key))
    }
}

/// [`RegistryReader`] using `RegOpenKeyExW` + `RegEnumValueW`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32RegistryReader;

impl Win32RegistryReader {
    fn open(location: &RegistryLocation, key: &str) -> Result<KeyHandle, OsError> {
        let root = match location.hive {
            RegistryHive::LocalMachine => HKEY_LOCAL_MACHINE,
            RegistryHive::CurrentUser => HKEY_CURRENT_USER,
        };
        let path: Vec<u16> = location
            .path
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();
        let mut handle = HKEY::default();
        let status =
            unsafe { RegOpenKeyExW(root, PCWSTR(path.as_ptr()), 0, KEY_READ, &mut handle) };
        check(status, key)?;
        Ok(KeyHandle(handle))
    }
}

impl RegistryReader for Win32RegistryReader {
    fn read_values(&self, location: &RegistryLocation) -> Result<Vec<RegistryValue>, OsError> {
        let key = location.to_string();
        let handle = Self::open(location, &key)?;

        let mut values = Vec::new();
        let mut name = vec![0u16; MAX_VALUE_NAME];
        let mut data = vec![0u8; INITIAL_DATA_BYTES];
        let mut index = 0u32;
        loop {
            let mut name_len = name.len() as u32;
            let mut data_len = data.len() as u32;
            let mut value_type = 0u32;
            let status = unsafe {
                RegEnumValueW(
                    handle.0,
                    index,
                    PWSTR(name.as_mut_ptr()),
                    &mut name_len,
                    None,
                    Some(&mut value_type as *mut u32),
                    Some(data.as_mut_ptr()),
                    Some(&mut data_len as *mut u32),
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            if status == ERROR_MORE_DATA {
                // data_len now holds the size required; retry the same index
                data.resize(data_len as usize, 0);
                continue;
            }
            check(status, &key)?;

            let name = &name[..name_len as usize];
            if let Some(value) = string_value(name, value_type, &data[..data_len as usize]) {
                values.push(value);
            }
            index += 1;
        }
        Ok(values)
    }
}
