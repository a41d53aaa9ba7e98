//! Windows registry access for startup entries and policy values.
//!
//! Every function returns `Unsupported` on other platforms.

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    CurrentUser,
    LocalMachine,
}

impl Hive {
    pub fn label(&self) -> &'static str {
        match self {
            Hive::CurrentUser => "HKCU",
            Hive::LocalMachine => "HKLM",
        }
    }
}

/// A string value read from a registry key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub hive: Hive,
    pub key: String,
    pub name: String,
    pub data: String,
}

impl RegistryEntry {
    pub fn location(&self) -> String {
        format!("{}\\{}", self.hive.label(), self.key)
    }
}

pub const RUN_KEY: &str = "Software\\Microsoft\\Windows\\CurrentVersion\\Run";
pub const RUN_ONCE_KEY: &str = "Software\\Microsoft\\Windows\\CurrentVersion\\RunOnce";

/// Run and RunOnce keys in both hives
pub const AUTOSTART_KEYS: &[(Hive, &str)] = &[
    (Hive::CurrentUser, RUN_KEY),
    (Hive::LocalMachine, RUN_KEY),
    (Hive::CurrentUser, RUN_ONCE_KEY),
    (Hive::LocalMachine, RUN_ONCE_KEY),
];

#[cfg(windows)]
mod imp {
    use super::{Hive, RegistryEntry};
    use crate::error::{QdError, Result};
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ};
    use winreg::RegKey;

    fn root(hive: Hive) -> RegKey {
        match hive {
            Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        }
    }

    pub fn read_values(hive: Hive, key: &str) -> Result<Vec<RegistryEntry>> {
        let opened = root(hive).open_subkey_with_flags(key, KEY_READ)?;

        let mut entries = Vec::new();
        for value in opened.enum_values() {
            match value {
                Ok((name, data)) => entries.push(RegistryEntry {
                    hive,
                    key: key.to_string(),
                    name,
                    data: data.to_string(),
                }),
                Err(e) => log::debug!("Skipping unreadable value in {}: {}", key, e),
            }
        }
        Ok(entries)
    }

    pub fn set_dword(hive: Hive, key: &str, name: &str, value: u32) -> Result<()> {
        let (opened, _) = root(hive).create_subkey(key).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                QdError::permission_denied(format!("{}\\{}", hive.label(), key))
            } else {
                e.into()
            }
        })?;
        opened.set_value(name, &value)?;
        Ok(())
    }
}

#[cfg(not(windows))]
mod imp {
    use super::{Hive, RegistryEntry};
    use crate::error::{QdError, Result};

    pub fn read_values(_hive: Hive, _key: &str) -> Result<Vec<RegistryEntry>> {
        Err(QdError::unsupported("the registry only exists on Windows"))
    }

    pub fn set_dword(_hive: Hive, _key: &str, _name: &str, _value: u32) -> Result<()> {
        Err(QdError::unsupported("the registry only exists on Windows"))
    }
}

/// All string-convertible values of `key`
pub fn read_values(hive: Hive, key: &str) -> Result<Vec<RegistryEntry>> {
    imp::read_values(hive, key)
}

/// Create `key` if needed and write a DWORD value
pub fn set_dword(hive: Hive, key: &str, name: &str, value: u32) -> Result<()> {
    imp::set_dword(hive, key, name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_location() {
        let entry = RegistryEntry {
            hive: Hive::LocalMachine,
            key: RUN_KEY.to_string(),
            name: "Updater".into(),
            data: "C:\\updater.exe".into(),
        };
        assert_eq!(
            entry.location(),
            "HKLM\\Software\\Microsoft\\Windows\\CurrentVersion\\Run"
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_unsupported_off_windows() {
        assert!(matches!(
            read_values(Hive::CurrentUser, RUN_KEY),
            Err(crate::error::QdError::Unsupported(_))
        ));
    }
}
