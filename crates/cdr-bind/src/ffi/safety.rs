//! Safe wrappers for engine output slots
//!
//! The engine reports results through out-parameters: a pointer slot plus a
//! length slot for byte regions, a pointer slot for wide strings, an integer
//! slot for the process status. These wrappers own the slots for one call
//! and copy whatever the engine wrote into host-owned memory before the next
//! call can invalidate it.

use crate::ffi::types::{WidePtr, WideUnit};
use tracing::warn;

/// Null pointer check returning the pointer on success
pub fn check_null<T>(ptr: *const T) -> Option<*const T> {
    if ptr.is_null() {
        None
    } else {
        Some(ptr)
    }
}

/// Output byte region written by the engine: pointer slot and length slot
#[derive(Debug)]
pub struct OutputBuffer {
    ptr: *mut u8,
    len: usize,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// Slot the engine stores the region pointer into
    pub fn ptr_slot(&mut self) -> *mut *mut u8 {
        &mut self.ptr
    }

    /// Slot the engine stores the region length into
    pub fn len_slot(&mut self) -> *mut usize {
        &mut self.len
    }

    /// Reported length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the region only when the call succeeded
    ///
    /// # Safety
    ///
    /// Same contract as [`OutputBuffer::copy`].
    pub unsafe fn copy_if(&self, success: bool, entry_point: &str) -> Option<Vec<u8>> {
        if !success {
            return None;
        }
        self.copy(entry_point)
    }

    /// Copy the region regardless of status
    ///
    /// A zero length yields an empty buffer without touching the pointer. A
    /// null pointer with a non-zero length is reported and yields nothing.
    ///
    /// # Safety
    ///
    /// When non-null, the pointer must reference at least `len` readable
    /// bytes that stay valid until this returns.
    pub unsafe fn copy(&self, entry_point: &str) -> Option<Vec<u8>> {
        if self.len == 0 {
            return Some(Vec::new());
        }

        match check_null(self.ptr as *const u8) {
            Some(ptr) => Some(std::slice::from_raw_parts(ptr, self.len).to_vec()),
            None => {
                warn!(
                    entry_point,
                    len = self.len,
                    "engine reported output length with a null pointer"
                );
                None
            }
        }
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Output wide string written by the engine, with its reported size
#[derive(Debug)]
pub struct OutputWide {
    ptr: *mut WideUnit,
    len: usize,
}

impl OutputWide {
    pub fn new() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    pub fn ptr_slot(&mut self) -> *mut *mut WideUnit {
        &mut self.ptr
    }

    pub fn len_slot(&mut self) -> *mut usize {
        &mut self.len
    }

    pub fn as_ptr(&self) -> WidePtr {
        self.ptr as WidePtr
    }

    /// Upper bound on units to scan; unbounded when the engine reported none
    pub fn scan_limit(&self) -> Option<usize> {
        if self.len == 0 {
            None
        } else {
            Some(self.len)
        }
    }
}

impl Default for OutputWide {
    fn default() -> Self {
        Self::new()
    }
}

/// Output 32-bit integer written by the engine
#[derive(Debug, Default)]
pub struct OutputInt {
    value: u32,
}

impl OutputInt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&mut self) -> *mut u32 {
        &mut self.value
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}
