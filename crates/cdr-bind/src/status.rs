//! Engine status codes and file-type codes
//!
//! Both are engine-defined integers. The binding only distinguishes the
//! configured success value; everything else is passed through untouched.

use crate::error::{BindError, BindResult};
use crate::ffi::registry::EntryPoint;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Status returned by one entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    entry_point: EntryPoint,
    code: i32,
    success: bool,
}

impl Status {
    pub(crate) fn new(entry_point: EntryPoint, code: i32, policy: StatusPolicy) -> Self {
        Self {
            entry_point,
            code,
            success: policy.is_success(code),
        }
    }

    /// Raw engine status value
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Whether the code equals the engine's success value
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The entry point that produced this status
    pub fn entry_point(&self) -> EntryPoint {
        self.entry_point
    }

    /// Convert a non-success status into `NativeCallFailure`
    pub fn check(&self) -> BindResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(BindError::NativeCallFailure {
                entry_point: self.entry_point.name().to_string(),
                status: self.code,
            })
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.entry_point, self.code)
    }
}

/// Which status value the engine uses for success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    success: i32,
}

impl StatusPolicy {
    pub fn new(success: i32) -> Self {
        Self { success }
    }

    pub fn success_code(&self) -> i32 {
        self.success
    }

    pub fn is_success(&self, code: i32) -> bool {
        code == self.success
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(cdr_config::loader::DEFAULT_SUCCESS_STATUS)
    }
}

/// Engine-defined file type code, kept opaque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FileTypeCode(i32);

impl FileTypeCode {
    pub fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for FileTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional names for file type codes, supplied by configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTypeNames {
    names: BTreeMap<i32, String>,
}

impl FileTypeNames {
    pub fn new(names: BTreeMap<i32, String>) -> Self {
        Self { names }
    }

    pub fn name(&self, code: FileTypeCode) -> Option<&str> {
        self.names.get(&code.raw()).map(String::as_str)
    }

    pub fn insert(&mut self, code: i32, name: impl Into<String>) {
        self.names.insert(code, name.into());
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
