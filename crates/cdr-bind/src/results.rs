//! Typed result objects, one shape per call family
//!
//! Every result is created fresh by a single call and owns its data; no
//! field refers back into engine memory. `None` in a buffer or text field is
//! the "absent" value: the status said the output is not meaningful.

use crate::error::BindResult;
use crate::status::{FileTypeCode, Status};
use serde::Serialize;

/// Status-only result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResult {
    pub status: Status,
}

/// Status plus text (configuration and issue-ID lookups)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigResult {
    pub status: Status,
    pub text: Option<String>,
}

/// Status plus the engine's process status for the previous operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStatusResult {
    pub status: Status,
    pub process_status: u32,
}

/// Status plus one output buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferResult {
    pub status: Status,
    pub buffer: Option<Vec<u8>>,
}

/// Status plus an output buffer and an engineering report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferPlusReportResult {
    pub status: Status,
    pub buffer: Option<Vec<u8>>,
    pub report: Option<Vec<u8>>,
}

/// Determined file type, with the analysis report for the reporting variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTypeResult {
    pub file_type: FileTypeCode,
    pub report: Option<Vec<u8>>,
}

/// Text returned by message and version calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextResult {
    pub text: Option<String>,
}

impl StatusResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Fail with `NativeCallFailure` unless the status is success
    pub fn check(self) -> BindResult<Self> {
        self.status.check()?;
        Ok(self)
    }
}

impl ConfigResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Fail with `NativeCallFailure` unless the status is success
    pub fn check(self) -> BindResult<Self> {
        self.status.check()?;
        Ok(self)
    }
}

impl BufferResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Non-success status with no output: the engine could not rebuild the input
    pub fn is_non_conforming(&self) -> bool {
        !self.status.is_success() && self.buffer.is_none()
    }
}

impl BufferPlusReportResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_non_conforming(&self) -> bool {
        !self.status.is_success() && self.buffer.is_none()
    }
}

impl TextResult {
    /// Text or the empty string when the engine returned nothing
    pub fn as_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::registry::EntryPoint;
    use crate::status::StatusPolicy;

    fn status(entry: EntryPoint, code: i32) -> Status {
        Status::new(entry, code, StatusPolicy::new(1))
    }

    #[test]
    fn test_non_conforming_buffer_result() {
        let result = BufferResult {
            status: status(EntryPoint::FileProtect, 0),
            buffer: None,
        };
        assert!(result.is_non_conforming());
        assert!(!result.is_success());
    }

    #[test]
    fn test_empty_buffer_on_success_is_not_non_conforming() {
        let result = BufferResult {
            status: status(EntryPoint::FileProtect, 1),
            buffer: Some(Vec::new()),
        };
        assert!(!result.is_non_conforming());
    }

    #[test]
    fn test_config_check_passes_on_success() {
        let result = ConfigResult {
            status: status(EntryPoint::FileConfigGet, 1),
            text: Some("<config/>".to_string()),
        };
        assert_eq!(result.check().unwrap().text.as_deref(), Some("<config/>"));
    }

    #[test]
    fn test_status_check_fails_on_error() {
        let result = StatusResult {
            status: status(EntryPoint::FileConfigXml, 0),
        };
        assert!(result.check().is_err());
    }

    #[test]
    fn test_text_result_as_str() {
        assert_eq!(TextResult { text: None }.as_str(), "");
        assert_eq!(
            TextResult {
                text: Some("1.2.3".to_string())
            }
            .as_str(),
            "1.2.3"
        );
    }
}
