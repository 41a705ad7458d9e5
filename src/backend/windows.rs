//! Windows registry backend.
//!
//! Nodes are registry key handles opened with `KEY_NOTIFY`; signals are
//! unnamed Win32 events; arming is an asynchronous
//! `RegNotifyChangeKeyValue`; the composite wait is a single
//! `WaitForMultipleObjects` over `[cancel, wakeup]`.

#![allow(unsafe_code)]

use super::{Namespace, ResetMode, WaitOutcome, WatchFilter};
use crate::core::{ResolvedKey, RootKey};
use crate::error::{Result, WatchError};
use std::ptr;
use std::time::Duration;
use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_PATH_NOT_FOUND, ERROR_SUCCESS,
    GetLastError, HANDLE, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::System::Registry::{
    HKEY, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
    HKEY_PERFORMANCE_DATA, HKEY_USERS, KEY_NOTIFY, RegCloseKey, RegNotifyChangeKeyValue,
    RegOpenKeyExW,
};
use windows_sys::Win32::System::Threading::{
    CreateEventW, INFINITE, SetEvent, WaitForMultipleObjects,
};

fn root_handle(root: RootKey) -> HKEY {
    match root {
        RootKey::LocalMachine => HKEY_LOCAL_MACHINE,
        RootKey::CurrentUser => HKEY_CURRENT_USER,
        RootKey::ClassesRoot => HKEY_CLASSES_ROOT,
        RootKey::CurrentConfig => HKEY_CURRENT_CONFIG,
        RootKey::PerformanceData => HKEY_PERFORMANCE_DATA,
        RootKey::Users => HKEY_USERS,
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Milliseconds for `WaitForMultipleObjects`, rounded up so a wait never ends early.
fn wait_millis(budget: Option<Duration>) -> u32 {
    match budget {
        None => INFINITE,
        Some(budget) => {
            let ms = budget.as_nanos().div_ceil(1_000_000);
            u32::try_from(ms).unwrap_or(INFINITE - 1).min(INFINITE - 1)
        }
    }
}

/// The Windows registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryNamespace;

impl RegistryNamespace {
    /// Create a handle to the local registry.
    pub fn new() -> Self {
        Self
    }
}

/// An open registry key.
#[derive(Debug)]
pub struct RegistryNode {
    hkey: HKEY,
}

// SAFETY: a registry key handle may be used and closed from any thread.
unsafe impl Send for RegistryNode {}

impl Drop for RegistryNode {
    fn drop(&mut self) {
        // SAFETY: `hkey` was opened by RegOpenKeyExW and is closed exactly once.
        unsafe {
            RegCloseKey(self.hkey);
        }
    }
}

/// An unnamed Win32 event.
#[derive(Debug)]
pub struct RegistrySignal {
    handle: HANDLE,
}

// SAFETY: event handles are kernel objects usable from any thread.
unsafe impl Send for RegistrySignal {}
unsafe impl Sync for RegistrySignal {}

impl Drop for RegistrySignal {
    fn drop(&mut self) {
        // SAFETY: `handle` was returned by CreateEventW and is closed exactly once.
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

impl Namespace for RegistryNamespace {
    type Node = RegistryNode;
    type Signal = RegistrySignal;

    fn name(&self) -> &'static str {
        "registry"
    }

    fn open(&self, key: &ResolvedKey) -> Result<RegistryNode> {
        let sub_key = to_wide(&key.sub_path);
        let mut hkey: HKEY = ptr::null_mut();

        // SAFETY: `sub_key` is NUL-terminated and outlives the call; `hkey` is a valid out pointer.
        let status = unsafe {
            RegOpenKeyExW(root_handle(key.root), sub_key.as_ptr(), 0, KEY_NOTIFY, &mut hkey)
        };

        match status {
            ERROR_SUCCESS => Ok(RegistryNode { hkey }),
            ERROR_ACCESS_DENIED => Err(WatchError::PermissionDenied(format!(
                "notify access denied on {}",
                key
            ))),
            ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => {
                Err(WatchError::InvalidArgument(format!("key not found: {}", key)))
            }
            code => Err(WatchError::operation("RegOpenKeyExW", code)),
        }
    }

    fn create_signal(&self, mode: ResetMode) -> Result<RegistrySignal> {
        let manual = i32::from(mode == ResetMode::Manual);

        // SAFETY: null attributes and name create an unnamed, non-inheritable event.
        let handle = unsafe { CreateEventW(ptr::null(), manual, 0, ptr::null()) };
        if handle.is_null() {
            // SAFETY: reads the calling thread's last-error value.
            let code = unsafe { GetLastError() };
            return Err(WatchError::ResourceExhausted(format!(
                "CreateEventW failed with status {}",
                code
            )));
        }
        Ok(RegistrySignal { handle })
    }

    fn raise(&self, signal: &RegistrySignal) -> Result<()> {
        // SAFETY: `signal.handle` is a live event handle.
        if unsafe { SetEvent(signal.handle) } == 0 {
            // SAFETY: reads the calling thread's last-error value.
            let code = unsafe { GetLastError() };
            return Err(WatchError::operation("SetEvent", code));
        }
        Ok(())
    }

    fn arm(&self, node: &RegistryNode, wakeup: &RegistrySignal, filter: WatchFilter) -> Result<()> {
        // SAFETY: both handles are live for the duration of the call.
        let status = unsafe {
            RegNotifyChangeKeyValue(
                node.hkey,
                i32::from(filter.include_subtree),
                filter.triggers.bits(),
                wakeup.handle,
                1,
            )
        };

        match status {
            ERROR_SUCCESS => Ok(()),
            ERROR_ACCESS_DENIED => Err(WatchError::PermissionDenied(
                "notification request denied".into(),
            )),
            code => Err(WatchError::operation("RegNotifyChangeKeyValue", code)),
        }
    }

    fn wait(
        &self,
        cancel: &RegistrySignal,
        wakeup: &RegistrySignal,
        budget: Option<Duration>,
    ) -> Result<WaitOutcome> {
        let handles = [cancel.handle, wakeup.handle];

        // SAFETY: `handles` holds two live event handles and outlives the call.
        let result = unsafe { WaitForMultipleObjects(2, handles.as_ptr(), 0, wait_millis(budget)) };

        match result {
            WAIT_OBJECT_0 => Ok(WaitOutcome::Cancelled),
            r if r == WAIT_OBJECT_0 + 1 => Ok(WaitOutcome::Changed),
            WAIT_TIMEOUT => Ok(WaitOutcome::TimedOut),
            WAIT_FAILED => {
                // SAFETY: reads the calling thread's last-error value.
                let code = unsafe { GetLastError() };
                Err(WatchError::operation("WaitForMultipleObjects", code))
            }
            other => Err(WatchError::operation("WaitForMultipleObjects", other)),
        }
    }
}
