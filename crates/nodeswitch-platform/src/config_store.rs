use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryHive {
    LocalMachine,
    CurrentUser,
}

/// Read-only access to the OS configuration store (the registry on Windows).
pub trait ConfigStore: Send + Sync {
    /// Look up a string value. Missing keys, missing values and non-string
    /// values all read as `None`.
    fn read_string(&self, hive: RegistryHive, path: &str, name: &str) -> Option<String>;
}

/// The configuration store of the running OS. Reads nothing off Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemConfigStore;

impl ConfigStore for SystemConfigStore {
    #[cfg(windows)]
    fn read_string(&self, hive: RegistryHive, path: &str, name: &str) -> Option<String> {
        let value = registry::read_sz(hive, path, name);
        log::debug!(
            "registry {hive:?}\\{path}\\{name} -> {}",
            value.as_deref().unwrap_or("<missing>")
        );
        value
    }

    #[cfg(not(windows))]
    fn read_string(&self, _hive: RegistryHive, _path: &str, _name: &str) -> Option<String> {
        None
    }
}

#[cfg(windows)]
mod registry {
    use std::ptr;

    use windows_sys::Win32::Foundation::ERROR_SUCCESS;
    use windows_sys::Win32::System::Registry::{
        HKEY, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ, RegGetValueW,
    };

    use super::RegistryHive;

    fn to_wide(value: &str) -> Vec<u16> {
        value.encode_utf16().chain(std::iter::once(0)).collect()
    }

    pub(super) fn read_sz(hive: RegistryHive, path: &str, name: &str) -> Option<String> {
        let root: HKEY = match hive {
            RegistryHive::LocalMachine => HKEY_LOCAL_MACHINE,
            RegistryHive::CurrentUser => HKEY_CURRENT_USER,
        };
        let path = to_wide(path);
        let name = to_wide(name);

        let mut size: u32 = 0;
        // SAFETY: `path` and `name` are NUL-terminated UTF-16 buffers that
        // outlive the call; a null data pointer asks only for the size.
        let status = unsafe {
            RegGetValueW(
                root,
                path.as_ptr(),
                name.as_ptr(),
                RRF_RT_REG_SZ,
                ptr::null_mut(),
                ptr::null_mut(),
                &raw mut size,
            )
        };
        if status != ERROR_SUCCESS || size == 0 {
            return None;
        }

        let mut buffer = vec![0_u16; (size as usize).div_ceil(2)];
        // SAFETY: `buffer` holds at least `size` bytes and `size` reports
        // that capacity to the API.
        let status = unsafe {
            RegGetValueW(
                root,
                path.as_ptr(),
                name.as_ptr(),
                RRF_RT_REG_SZ,
                ptr::null_mut(),
                buffer.as_mut_ptr().cast(),
                &raw mut size,
            )
        };
        if status != ERROR_SUCCESS {
            return None;
        }

        let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
        let value = String::from_utf16_lossy(&buffer[..len]);
        (!value.is_empty()).then_some(value)
    }
}

/// In-memory store, for tests and for callers that want to pin lookups.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: HashMap<(RegistryHive, String, String), String>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(
        mut self,
        hive: RegistryHive,
        path: &str,
        name: &str,
        value: impl Into<String>,
    ) -> Self {
        self.values
            .insert((hive, path.to_string(), name.to_string()), value.into());
        self
    }
}

impl ConfigStore for MemoryConfigStore {
    fn read_string(&self, hive: RegistryHive, path: &str, name: &str) -> Option<String> {
        self.values
            .get(&(hive, path.to_string(), name.to_string()))
            .filter(|value| !value.is_empty())
            .cloned()
    }
}
