//! Registry value decoding and error classification
//!
//! The Win32 reader hands raw `RegEnumValueW` results to these helpers, so
//! the decoding and the status-code mapping stay the same on every build.

use super::traits::{OsError, RegistryValue};

pub const ERROR_FILE_NOT_FOUND: u32 = 2;
pub const ERROR_ACCESS_DENIED: u32 = 5;

/// Value types that carry a command line.
const REG_SZ: u32 = 1;
const REG_EXPAND_SZ: u32 = 2;

/// Name shown for a key's unnamed value.
const DEFAULT_VALUE_NAME: &str = "(Default)";

/// Map a registry status code for `key` onto [`OsError`].
///
/// Classification works on the numeric code, never on message text, so it
/// holds on every display language.
pub fn registry_error(code: u32, key: &str) -> OsError {
    match code {
        ERROR_FILE_NOT_FOUND => OsError::NotFound(key.to_string()),
        ERROR_ACCESS_DENIED => OsError::AccessDenied(key.to_string()),
        code => OsError::System {
            code: code as i32,
            message: format!("registry error {} reading {}", code, key),
        },
    }
}

/// UTF-16 text up to the first NUL.
pub fn decode_wide(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

/// Build a [`RegistryValue`] from one enumerated value.
///
/// `data` is the raw little-endian byte buffer the value was read into.
/// Non-string types and an empty default value yield `None`.
pub fn string_value(name: &[u16], value_type: u32, data: &[u8]) -> Option<RegistryValue> {
    if value_type != REG_SZ && value_type != REG_EXPAND_SZ {
        return None;
    }

    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let data = decode_wide(&units);
    let name = decode_wide(name);

    if name.is_empty() {
        if data.is_empty() {
            return None;
        }
        return Some(RegistryValue {
            name: DEFAULT_VALUE_NAME.to_string(),
            data,
        });
    }
    Some(RegistryValue { name, data })
}
