//! Call signature registry
//!
//! Maps entry point names to their declared `CallSignature`. The standard
//! table below is the complete ABI surface of the engine; it is declared
//! once and checked against every resolved symbol before a call is made.

use crate::ffi::types::{ArgKind, CallSignature, ReturnKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Every entry point of the engine ABI.
///
/// Also used as the operation identifier recorded by the call-state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntryPoint {
    FileConfigXml,
    FileConfigGet,
    FileConfigRevertToDefaults,
    GetIdInfo,
    GetAllIdInfo,
    FileProtect,
    FileProtectLite,
    FileAnalysisAudit,
    FileToFileProtect,
    FileToFileProtectLite,
    FileToFileAnalysisAudit,
    FileToFileAnalysisProtectAndExport,
    FileToFileProtectAndImport,
    FileToMemoryAnalysisProtectAndExport,
    FileToMemoryProtectAndImport,
    FileProtectAndReport,
    FileProtectLiteAndReport,
    FileAnalysisAuditAndReport,
    FileToFileProtectAndReport,
    FileToFileProtectLiteAndReport,
    FileToFileAnalysisAuditAndReport,
    MemoryToMemoryProtect,
    MemoryToMemoryAnalysisAudit,
    DetermineFileTypeFromFile,
    DetermineFileTypeFromFileAndReport,
    DetermineFileTypeFromFileInMem,
    DetermineFileTypeFromFileInMemAndReport,
    FileProcessStatus,
    FileProcessMsg,
    FileErrorMsg,
    FileVersion,
    FileDone,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 32] = [
        EntryPoint::FileConfigXml,
        EntryPoint::FileConfigGet,
        EntryPoint::FileConfigRevertToDefaults,
        EntryPoint::GetIdInfo,
        EntryPoint::GetAllIdInfo,
        EntryPoint::FileProtect,
        EntryPoint::FileProtectLite,
        EntryPoint::FileAnalysisAudit,
        EntryPoint::FileToFileProtect,
        EntryPoint::FileToFileProtectLite,
        EntryPoint::FileToFileAnalysisAudit,
        EntryPoint::FileToFileAnalysisProtectAndExport,
        EntryPoint::FileToFileProtectAndImport,
        EntryPoint::FileToMemoryAnalysisProtectAndExport,
        EntryPoint::FileToMemoryProtectAndImport,
        EntryPoint::FileProtectAndReport,
        EntryPoint::FileProtectLiteAndReport,
        EntryPoint::FileAnalysisAuditAndReport,
        EntryPoint::FileToFileProtectAndReport,
        EntryPoint::FileToFileProtectLiteAndReport,
        EntryPoint::FileToFileAnalysisAuditAndReport,
        EntryPoint::MemoryToMemoryProtect,
        EntryPoint::MemoryToMemoryAnalysisAudit,
        EntryPoint::DetermineFileTypeFromFile,
        EntryPoint::DetermineFileTypeFromFileAndReport,
        EntryPoint::DetermineFileTypeFromFileInMem,
        EntryPoint::DetermineFileTypeFromFileInMemAndReport,
        EntryPoint::FileProcessStatus,
        EntryPoint::FileProcessMsg,
        EntryPoint::FileErrorMsg,
        EntryPoint::FileVersion,
        EntryPoint::FileDone,
    ];

    /// Exported symbol name
    pub fn name(&self) -> &'static str {
        match self {
            EntryPoint::FileConfigXml => "GWFileConfigXML",
            EntryPoint::FileConfigGet => "GWFileConfigGet",
            EntryPoint::FileConfigRevertToDefaults => "GWFileConfigRevertToDefaults",
            EntryPoint::GetIdInfo => "GWGetIdInfo",
            EntryPoint::GetAllIdInfo => "GWGetAllIdInfo",
            EntryPoint::FileProtect => "GWFileProtect",
            EntryPoint::FileProtectLite => "GWFileProtectLite",
            EntryPoint::FileAnalysisAudit => "GWFileAnalysisAudit",
            EntryPoint::FileToFileProtect => "GWFileToFileProtect",
            EntryPoint::FileToFileProtectLite => "GWFileToFileProtectLite",
            EntryPoint::FileToFileAnalysisAudit => "GWFileToFileAnalysisAudit",
            EntryPoint::FileToFileAnalysisProtectAndExport => {
                "GWFileToFileAnalysisProtectAndExport"
            }
            EntryPoint::FileToFileProtectAndImport => "GWFileToFileProtectAndImport",
            EntryPoint::FileToMemoryAnalysisProtectAndExport => {
                "GWFileToMemoryAnalysisProtectAndExport"
            }
            EntryPoint::FileToMemoryProtectAndImport => "GWFileToMemoryProtectAndImport",
            EntryPoint::FileProtectAndReport => "GWFileProtectAndReport",
            EntryPoint::FileProtectLiteAndReport => "GWFileProtectLiteAndReport",
            EntryPoint::FileAnalysisAuditAndReport => "GWFileAnalysisAuditAndReport",
            EntryPoint::FileToFileProtectAndReport => "GWFileToFileProtectAndReport",
            EntryPoint::FileToFileProtectLiteAndReport => "GWFileToFileProtectLiteAndReport",
            EntryPoint::FileToFileAnalysisAuditAndReport => "GWFileToFileAnalysisAuditAndReport",
            EntryPoint::MemoryToMemoryProtect => "GWMemoryToMemoryProtect",
            EntryPoint::MemoryToMemoryAnalysisAudit => "GWMemoryToMemoryAnalysisAudit",
            EntryPoint::DetermineFileTypeFromFile => "GWDetermineFileTypeFromFile",
            EntryPoint::DetermineFileTypeFromFileAndReport => {
                "GWDetermineFileTypeFromFileAndReport"
            }
            EntryPoint::DetermineFileTypeFromFileInMem => "GWDetermineFileTypeFromFileInMem",
            EntryPoint::DetermineFileTypeFromFileInMemAndReport => {
                "GWDetermineFileTypeFromFileInMemAndReport"
            }
            EntryPoint::FileProcessStatus => "GWFileProcessStatus",
            EntryPoint::FileProcessMsg => "GWFileProcessMsg",
            EntryPoint::FileErrorMsg => "GWFileErrorMsg",
            EntryPoint::FileVersion => "GWFileVersion",
            EntryPoint::FileDone => "GWFileDone",
        }
    }

    /// Look up an entry point by its exported symbol name
    pub fn from_name(name: &str) -> Option<EntryPoint> {
        EntryPoint::ALL.iter().copied().find(|e| e.name() == name)
    }

    /// The fixed ABI shape of this entry point
    pub fn signature(&self) -> CallSignature {
        use ArgKind::*;

        const INT: ReturnKind = ReturnKind::FixedWidthInt(32);
        match self {
            EntryPoint::FileConfigXml => CallSignature::new(&[WideString], INT),
            EntryPoint::FileConfigGet => CallSignature::new(&[OutputWidePointer, OutputByteLength], INT),
            EntryPoint::FileConfigRevertToDefaults => CallSignature::new(&[], INT),
            // Length precedes the pointer for both ID lookups
            EntryPoint::GetIdInfo => CallSignature::new(
                &[FixedWidthInt(32), OutputByteLength, OutputBytePointer],
                INT,
            ),
            EntryPoint::GetAllIdInfo => CallSignature::new(&[OutputByteLength, OutputBytePointer], INT),
            EntryPoint::FileProtect
            | EntryPoint::FileProtectLite
            | EntryPoint::FileAnalysisAudit => CallSignature::new(
                &[WideString, WideString, OutputBytePointer, OutputByteLength],
                INT,
            ),
            EntryPoint::FileToFileProtect
            | EntryPoint::FileToFileProtectLite
            | EntryPoint::FileToFileAnalysisAudit => {
                CallSignature::new(&[WideString, WideString, WideString], INT)
            }
            EntryPoint::FileToFileAnalysisProtectAndExport
            | EntryPoint::FileToFileProtectAndImport => CallSignature::new(&[WideString, WideString], INT),
            EntryPoint::FileToMemoryAnalysisProtectAndExport
            | EntryPoint::FileToMemoryProtectAndImport => {
                CallSignature::new(&[WideString, OutputBytePointer, OutputByteLength], INT)
            }
            EntryPoint::FileProtectAndReport
            | EntryPoint::FileProtectLiteAndReport
            | EntryPoint::FileAnalysisAuditAndReport => CallSignature::new(
                &[
                    WideString,
                    WideString,
                    OutputBytePointer,
                    OutputByteLength,
                    OutputBytePointer,
                    OutputByteLength,
                ],
                INT,
            ),
            EntryPoint::FileToFileProtectAndReport
            | EntryPoint::FileToFileProtectLiteAndReport
            | EntryPoint::FileToFileAnalysisAuditAndReport => {
                CallSignature::new(&[WideString, WideString, WideString, WideString], INT)
            }
            EntryPoint::MemoryToMemoryProtect | EntryPoint::MemoryToMemoryAnalysisAudit => CallSignature::new(
                &[
                    BytePointer,
                    ByteLength,
                    WideString,
                    OutputBytePointer,
                    OutputByteLength,
                ],
                INT,
            ),
            EntryPoint::DetermineFileTypeFromFile => CallSignature::new(&[WideString], INT),
            EntryPoint::DetermineFileTypeFromFileAndReport => {
                CallSignature::new(&[WideString, OutputBytePointer, OutputByteLength], INT)
            }
            EntryPoint::DetermineFileTypeFromFileInMem => CallSignature::new(&[BytePointer, ByteLength], INT),
            EntryPoint::DetermineFileTypeFromFileInMemAndReport => CallSignature::new(
                &[BytePointer, ByteLength, OutputBytePointer, OutputByteLength],
                INT,
            ),
            EntryPoint::FileProcessStatus => CallSignature::new(&[OutputFixedWidthInt(32)], INT),
            EntryPoint::FileProcessMsg | EntryPoint::FileErrorMsg | EntryPoint::FileVersion => {
                CallSignature::new(&[], ReturnKind::WidePointer)
            }
            EntryPoint::FileDone => CallSignature::new(&[], INT),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registry of declared entry point signatures, keyed by symbol name
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    signatures: BTreeMap<String, CallSignature>,
}

impl SignatureRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every entry point of the engine ABI
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for entry in EntryPoint::ALL {
            let sig = entry.signature();
            registry.declare(entry.name(), sig.args(), sig.return_kind());
        }
        registry
    }

    /// Declare the signature of an entry point
    ///
    /// Declaring the same shape again is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already declared with a different shape. The ABI of
    /// an entry point is fixed, so a conflicting declaration is a bug in the
    /// caller, not a condition to recover from.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        args: &[ArgKind],
        ret: ReturnKind,
    ) -> &CallSignature {
        let name = name.into();
        let sig = CallSignature::new(args, ret);

        if let Some(existing) = self.signatures.get(&name) {
            assert!(
                *existing == sig,
                "conflicting signature for entry point '{}': declared {}, redeclared {}",
                name,
                existing,
                sig
            );
        }

        self.signatures.entry(name).or_insert(sig)
    }

    /// Look up the declared signature of an entry point
    pub fn get(&self, name: &str) -> Option<&CallSignature> {
        self.signatures.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signatures.contains_key(name)
    }

    /// Declared names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signatures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
