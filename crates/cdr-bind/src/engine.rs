//! Operation facade over the engine's entry points
//!
//! `Engine` owns the `LibraryHandle` behind a mutex. All engine calls go
//! through a `Session`, which holds that lock for its whole lifetime, so
//! at most one native call is ever in flight per engine and an operation
//! plus the state reads describing it can share one critical section.
//!
//! Each facade method follows the same steps: bind the entry point to its
//! function type, marshal arguments into a `MarshalContext`, make the call,
//! record the new call-state, copy outputs into host memory, and package a
//! typed result. Engine status codes are returned as data.

use crate::error::{BindError, BindResult};
use crate::ffi::caller::NativeFn;
use crate::ffi::loader::{LibraryHandle, LibrarySearch, ResolveMode, SymbolSource};
use crate::ffi::marshal::{MarshalContext, WideEncoding};
use crate::ffi::registry::{EntryPoint, SignatureRegistry};
use crate::ffi::safety::{OutputBuffer, OutputWide};
use crate::ffi::types::{WidePtr, WideUnit};
use crate::results::{
    BufferPlusReportResult, BufferResult, ConfigResult, FileTypeResult, StatusResult, TextResult,
};
use crate::state::CallState;
use crate::status::{FileTypeCode, FileTypeNames, Status, StatusPolicy};
use cdr_config::{Config, ConfigError, ConfigLoader};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type WideInFn = unsafe extern "C" fn(WidePtr) -> i32;
type NoArgFn = unsafe extern "C" fn() -> i32;
type ConfigGetFn = unsafe extern "C" fn(*mut *mut WideUnit, *mut usize) -> i32;
type IdInfoFn = unsafe extern "C" fn(u32, *mut usize, *mut *mut u8) -> i32;
type AllIdInfoFn = unsafe extern "C" fn(*mut usize, *mut *mut u8) -> i32;
type FileToMemoryFn = unsafe extern "C" fn(WidePtr, WidePtr, *mut *mut u8, *mut usize) -> i32;
type FileToFileFn = unsafe extern "C" fn(WidePtr, WidePtr, WidePtr) -> i32;
type PathPairFn = unsafe extern "C" fn(WidePtr, WidePtr) -> i32;
type PathToMemoryFn = unsafe extern "C" fn(WidePtr, *mut *mut u8, *mut usize) -> i32;
type FileToMemoryReportFn =
    unsafe extern "C" fn(WidePtr, WidePtr, *mut *mut u8, *mut usize, *mut *mut u8, *mut usize) -> i32;
type FileToFileReportFn = unsafe extern "C" fn(WidePtr, WidePtr, WidePtr, WidePtr) -> i32;
type MemoryToMemoryFn =
    unsafe extern "C" fn(*const u8, usize, WidePtr, *mut *mut u8, *mut usize) -> i32;
type InMemFn = unsafe extern "C" fn(*const u8, usize) -> i32;
type InMemReportFn = unsafe extern "C" fn(*const u8, usize, *mut *mut u8, *mut usize) -> i32;
type WideOutFn = unsafe extern "C" fn() -> WidePtr;

/// Engine state guarded by the session lock
pub(crate) struct EngineCore {
    pub(crate) handle: LibraryHandle,
    pub(crate) state: CallState,
    encoding: WideEncoding,
    policy: StatusPolicy,
    file_types: FileTypeNames,
    finished: bool,
}

impl EngineCore {
    pub(crate) fn marshal(&self, entry: EntryPoint) -> MarshalContext {
        MarshalContext::new(entry, self.encoding)
    }

    pub(crate) fn status(&self, entry: EntryPoint, code: i32) -> Status {
        Status::new(entry, code, self.policy)
    }

    /// Move the call-state after a native call was issued
    fn record(&mut self, entry: EntryPoint, code: i32) -> Status {
        self.state = CallState::AfterOperation(entry);
        let status = self.status(entry, code);
        debug!(entry_point = %entry, status = code, success = status.is_success(), "engine call");
        status
    }

    fn bind<F: NativeFn>(&mut self, entry: EntryPoint) -> BindResult<F> {
        self.handle.bind::<F>(entry.name())
    }

    fn done(&mut self) -> BindResult<Status> {
        let entry = EntryPoint::FileDone;
        let f: NoArgFn = self.bind(entry)?;
        let code = unsafe { f() };
        self.finished = true;
        Ok(self.record(entry, code))
    }
}

/// A bound CDR engine
///
/// # Example
///
/// ```no_run
/// use cdr_bind::Engine;
/// use std::path::Path;
///
/// let engine = Engine::open("glasswall.classic").unwrap();
/// {
///     let mut session = engine.session();
///     let result = session.file_protect(Path::new("in.pdf"), "pdf").unwrap();
///     if result.is_non_conforming() {
///         let reason = session.error_message().unwrap();
///         eprintln!("non-conforming: {}", reason.as_str());
///     }
/// }
/// engine.shutdown().unwrap();
/// ```
pub struct Engine {
    core: Mutex<EngineCore>,
}

impl Engine {
    /// Load the engine library by path or short name with default settings
    pub fn open(library: &str) -> BindResult<Self> {
        EngineBuilder::new().library(library).open()
    }

    /// Load the engine as configured by `cdr.toml` found from `dir` upwards
    pub fn from_directory(dir: &Path) -> BindResult<Self> {
        let config = ConfigLoader::new().load_from_directory(dir)?;
        EngineBuilder::from_config(&config)?.open()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Exclusive access to the engine; blocks while another session is open
    pub fn session(&self) -> Session<'_> {
        Session {
            core: self.core.lock(),
        }
    }

    /// Exclusive access if no other session is open
    pub fn try_session(&self) -> Option<Session<'_>> {
        self.core.try_lock().map(|core| Session { core })
    }

    /// `GWFileDone`: release engine resources and consume the engine
    pub fn shutdown(self) -> BindResult<StatusResult> {
        let status = self.core.lock().done()?;
        info!(status = status.code(), "engine shut down");
        Ok(StatusResult { status })
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        if core.finished {
            return;
        }

        warn!(
            library = core.handle.library_name(),
            "engine dropped without shutdown, releasing resources"
        );
        if let Err(e) = core.done() {
            warn!(error = %e, "engine teardown failed");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

/// Builder for `Engine`, seeded from configuration or set explicitly
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    library: Option<String>,
    search_paths: Vec<PathBuf>,
    mode: ResolveMode,
    encoding: WideEncoding,
    policy: StatusPolicy,
    file_types: FileTypeNames,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            library: None,
            search_paths: Vec::new(),
            mode: ResolveMode::default(),
            encoding: WideEncoding::platform_default(),
            policy: StatusPolicy::default(),
            file_types: FileTypeNames::default(),
        }
    }

    /// Builder seeded from merged configuration
    pub fn from_config(config: &Config) -> BindResult<Self> {
        let mut builder = Self::new();
        builder.library = config.library_path().map(|p| p.display().to_string());
        builder.search_paths = config.search_paths();
        builder.mode = config.resolve_mode().parse::<ResolveMode>()?;
        if let Some(encoding) = config.wide_encoding() {
            builder.encoding = encoding.parse::<WideEncoding>().map_err(|e| {
                BindError::Config(ConfigError::InvalidValue {
                    field: "marshal.wide_encoding".to_string(),
                    reason: format!("{}", e),
                })
            })?;
        }
        builder.policy = StatusPolicy::new(config.success_status());
        builder.file_types = FileTypeNames::new(config.file_type_names());
        Ok(builder)
    }

    /// Library path or short name
    pub fn library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Directory searched before the platform defaults
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn resolve_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn wide_encoding(mut self, encoding: WideEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Status value the engine uses for success
    pub fn success_status(mut self, code: i32) -> Self {
        self.policy = StatusPolicy::new(code);
        self
    }

    pub fn file_type_name(mut self, code: i32, name: impl Into<String>) -> Self {
        self.file_types.insert(code, name);
        self
    }

    /// Load the configured library and bind the standard entry points
    pub fn open(self) -> BindResult<Engine> {
        let library = self.library.clone().ok_or_else(|| {
            BindError::Config(ConfigError::InvalidValue {
                field: "library.path".to_string(),
                reason: "no engine library configured".to_string(),
            })
        })?;

        let search = LibrarySearch::with_paths(self.search_paths.clone());
        let handle = LibraryHandle::open_with(&library, &search, self.mode)?;
        Ok(self.build(handle))
    }

    /// Bind the standard entry points from an arbitrary symbol source
    pub fn open_source(self, source: Box<dyn SymbolSource>) -> BindResult<Engine> {
        let handle = LibraryHandle::from_source(source, SignatureRegistry::standard(), self.mode)?;
        Ok(self.build(handle))
    }

    fn build(self, handle: LibraryHandle) -> Engine {
        info!(
            library = handle.library_name(),
            encoding = %self.encoding,
            success_status = self.policy.success_code(),
            "engine ready"
        );
        Engine {
            core: Mutex::new(EngineCore {
                handle,
                state: CallState::Idle,
                encoding: self.encoding,
                policy: self.policy,
                file_types: self.file_types,
                finished: false,
            }),
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to an `Engine`
///
/// Holds the engine lock until dropped. Every operation and state accessor
/// is a method here, so no other thread can call into the engine between an
/// operation and the reads describing it.
pub struct Session<'a> {
    pub(crate) core: MutexGuard<'a, EngineCore>,
}

impl Session<'_> {
    // Configuration

    /// `GWFileConfigXML`: apply a content management configuration
    pub fn file_config_xml(&mut self, xml: &str) -> BindResult<StatusResult> {
        let entry = EntryPoint::FileConfigXml;
        let f: WideInFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let xml = ctx.wide(0, xml)?;

        let code = unsafe { f(xml) };
        Ok(StatusResult {
            status: self.core.record(entry, code),
        })
    }

    /// `GWFileConfigGet`: current configuration as XML text
    pub fn file_config_get(&mut self) -> BindResult<ConfigResult> {
        let entry = EntryPoint::FileConfigGet;
        let f: ConfigGetFn = self.core.bind(entry)?;
        let ctx = self.core.marshal(entry);

        let mut out = OutputWide::new();
        let code = unsafe { f(out.ptr_slot(), out.len_slot()) };
        let status = self.core.record(entry, code);

        let text = if status.is_success() {
            unsafe { ctx.wide_out(0, out.as_ptr(), out.scan_limit())? }
        } else {
            None
        };
        Ok(ConfigResult { status, text })
    }

    /// `GWFileConfigRevertToDefaults`
    pub fn file_config_revert_to_defaults(&mut self) -> BindResult<StatusResult> {
        let status = self.no_arg(EntryPoint::FileConfigRevertToDefaults)?;
        Ok(StatusResult { status })
    }

    // Issue IDs

    /// `GWGetIdInfo`: group description of one issue ID
    pub fn get_id_info(&mut self, issue_id: u32) -> BindResult<ConfigResult> {
        let entry = EntryPoint::GetIdInfo;
        let f: IdInfoFn = self.core.bind(entry)?;
        let ctx = self.core.marshal(entry);

        let mut out = OutputBuffer::new();
        let code = unsafe { f(issue_id, out.len_slot(), out.ptr_slot()) };
        let status = self.core.record(entry, code);

        let bytes = unsafe { out.copy_if(status.is_success(), entry.name()) };
        let text = narrow_text(&ctx, 2, bytes)?;
        Ok(ConfigResult { status, text })
    }

    /// `GWGetAllIdInfo`: full issue ID catalog as XML text
    pub fn get_all_id_info(&mut self) -> BindResult<ConfigResult> {
        let entry = EntryPoint::GetAllIdInfo;
        let f: AllIdInfoFn = self.core.bind(entry)?;
        let ctx = self.core.marshal(entry);

        let mut out = OutputBuffer::new();
        let code = unsafe { f(out.len_slot(), out.ptr_slot()) };
        let status = self.core.record(entry, code);

        let bytes = unsafe { out.copy_if(status.is_success(), entry.name()) };
        let text = narrow_text(&ctx, 1, bytes)?;
        Ok(ConfigResult { status, text })
    }

    // File → Memory

    /// `GWFileProtect`: sanitized file in memory; absent when non-conforming
    pub fn file_protect(&mut self, input: &Path, file_type: &str) -> BindResult<BufferResult> {
        self.file_to_memory(EntryPoint::FileProtect, input, file_type)
    }

    /// `GWFileProtectLite`
    pub fn file_protect_lite(&mut self, input: &Path, file_type: &str) -> BindResult<BufferResult> {
        self.file_to_memory(EntryPoint::FileProtectLite, input, file_type)
    }

    /// `GWFileAnalysisAudit`: analysis report in memory
    pub fn file_analysis_audit(&mut self, input: &Path, file_type: &str) -> BindResult<BufferResult> {
        self.file_to_memory(EntryPoint::FileAnalysisAudit, input, file_type)
    }

    // File → File

    /// `GWFileToFileProtect`
    ///
    /// No output file is created when the output directory is missing or the
    /// input is non-conforming; both show up only in the status.
    pub fn file_to_file_protect(
        &mut self,
        input: &Path,
        file_type: &str,
        output: &Path,
    ) -> BindResult<StatusResult> {
        self.file_to_file(EntryPoint::FileToFileProtect, input, file_type, output)
    }

    /// `GWFileToFileProtectLite`
    pub fn file_to_file_protect_lite(
        &mut self,
        input: &Path,
        file_type: &str,
        output: &Path,
    ) -> BindResult<StatusResult> {
        self.file_to_file(EntryPoint::FileToFileProtectLite, input, file_type, output)
    }

    /// `GWFileToFileAnalysisAudit`: analysis report written to `analysis`
    pub fn file_to_file_analysis_audit(
        &mut self,
        input: &Path,
        file_type: &str,
        analysis: &Path,
    ) -> BindResult<StatusResult> {
        self.file_to_file(EntryPoint::FileToFileAnalysisAudit, input, file_type, analysis)
    }

    // Export / import

    /// `GWFileToFileAnalysisProtectAndExport`: write an export archive
    pub fn file_to_file_analysis_protect_and_export(
        &mut self,
        input: &Path,
        export: &Path,
    ) -> BindResult<StatusResult> {
        self.path_pair(EntryPoint::FileToFileAnalysisProtectAndExport, input, export)
    }

    /// `GWFileToFileProtectAndImport`: restore a file from an export archive
    pub fn file_to_file_protect_and_import(
        &mut self,
        archive: &Path,
        output: &Path,
    ) -> BindResult<StatusResult> {
        self.path_pair(EntryPoint::FileToFileProtectAndImport, archive, output)
    }

    /// `GWFileToMemoryAnalysisProtectAndExport`: export archive in memory
    pub fn file_to_memory_analysis_protect_and_export(
        &mut self,
        input: &Path,
    ) -> BindResult<BufferResult> {
        self.path_to_memory(EntryPoint::FileToMemoryAnalysisProtectAndExport, input)
    }

    /// `GWFileToMemoryProtectAndImport`: file restored from an archive, in memory
    pub fn file_to_memory_protect_and_import(&mut self, archive: &Path) -> BindResult<BufferResult> {
        self.path_to_memory(EntryPoint::FileToMemoryProtectAndImport, archive)
    }

    // File → Memory with report

    /// `GWFileProtectAndReport`
    ///
    /// The report is copied whatever the status; it often explains why the
    /// file buffer is absent.
    pub fn file_protect_and_report(
        &mut self,
        input: &Path,
        file_type: &str,
    ) -> BindResult<BufferPlusReportResult> {
        self.file_to_memory_report(EntryPoint::FileProtectAndReport, input, file_type)
    }

    /// `GWFileProtectLiteAndReport`
    pub fn file_protect_lite_and_report(
        &mut self,
        input: &Path,
        file_type: &str,
    ) -> BindResult<BufferPlusReportResult> {
        self.file_to_memory_report(EntryPoint::FileProtectLiteAndReport, input, file_type)
    }

    /// `GWFileAnalysisAuditAndReport`
    pub fn file_analysis_audit_and_report(
        &mut self,
        input: &Path,
        file_type: &str,
    ) -> BindResult<BufferPlusReportResult> {
        self.file_to_memory_report(EntryPoint::FileAnalysisAuditAndReport, input, file_type)
    }

    // File → File with report

    /// `GWFileToFileProtectAndReport`
    pub fn file_to_file_protect_and_report(
        &mut self,
        input: &Path,
        file_type: &str,
        output: &Path,
        report: &Path,
    ) -> BindResult<StatusResult> {
        self.file_to_file_report(EntryPoint::FileToFileProtectAndReport, input, file_type, output, report)
    }

    /// `GWFileToFileProtectLiteAndReport`
    pub fn file_to_file_protect_lite_and_report(
        &mut self,
        input: &Path,
        file_type: &str,
        output: &Path,
        report: &Path,
    ) -> BindResult<StatusResult> {
        self.file_to_file_report(
            EntryPoint::FileToFileProtectLiteAndReport,
            input,
            file_type,
            output,
            report,
        )
    }

    /// `GWFileToFileAnalysisAuditAndReport`
    pub fn file_to_file_analysis_audit_and_report(
        &mut self,
        input: &Path,
        file_type: &str,
        output: &Path,
        report: &Path,
    ) -> BindResult<StatusResult> {
        self.file_to_file_report(
            EntryPoint::FileToFileAnalysisAuditAndReport,
            input,
            file_type,
            output,
            report,
        )
    }

    // Memory → Memory

    /// `GWMemoryToMemoryProtect`
    pub fn memory_to_memory_protect(&mut self, input: &[u8], file_type: &str) -> BindResult<BufferResult> {
        self.memory_to_memory(EntryPoint::MemoryToMemoryProtect, input, file_type)
    }

    /// `GWMemoryToMemoryAnalysisAudit`
    pub fn memory_to_memory_analysis_audit(
        &mut self,
        input: &[u8],
        file_type: &str,
    ) -> BindResult<BufferResult> {
        self.memory_to_memory(EntryPoint::MemoryToMemoryAnalysisAudit, input, file_type)
    }

    // File type determination

    /// `GWDetermineFileTypeFromFile`
    pub fn determine_file_type_from_file(&mut self, input: &Path) -> BindResult<FileTypeResult> {
        let entry = EntryPoint::DetermineFileTypeFromFile;
        let f: WideInFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let path = ctx.path(0, input)?;

        let code = unsafe { f(path) };
        Ok(FileTypeResult {
            file_type: self.record_file_type(entry, code),
            report: None,
        })
    }

    /// `GWDetermineFileTypeFromFileAndReport`
    pub fn determine_file_type_from_file_and_report(
        &mut self,
        input: &Path,
    ) -> BindResult<FileTypeResult> {
        let entry = EntryPoint::DetermineFileTypeFromFileAndReport;
        let f: PathToMemoryFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let path = ctx.path(0, input)?;

        let mut report = OutputBuffer::new();
        let code = unsafe { f(path, report.ptr_slot(), report.len_slot()) };
        let file_type = self.record_file_type(entry, code);
        Ok(FileTypeResult {
            file_type,
            report: unsafe { report.copy(entry.name()) },
        })
    }

    /// `GWDetermineFileTypeFromFileInMem`
    pub fn determine_file_type_from_memory(&mut self, input: &[u8]) -> BindResult<FileTypeResult> {
        let entry = EntryPoint::DetermineFileTypeFromFileInMem;
        let f: InMemFn = self.core.bind(entry)?;
        let ctx = self.core.marshal(entry);
        let (data, len) = ctx.bytes(input);

        let code = unsafe { f(data, len) };
        Ok(FileTypeResult {
            file_type: self.record_file_type(entry, code),
            report: None,
        })
    }

    /// `GWDetermineFileTypeFromFileInMemAndReport`
    pub fn determine_file_type_from_memory_and_report(
        &mut self,
        input: &[u8],
    ) -> BindResult<FileTypeResult> {
        let entry = EntryPoint::DetermineFileTypeFromFileInMemAndReport;
        let f: InMemReportFn = self.core.bind(entry)?;
        let ctx = self.core.marshal(entry);
        let (data, len) = ctx.bytes(input);

        let mut report = OutputBuffer::new();
        let code = unsafe { f(data, len, report.ptr_slot(), report.len_slot()) };
        let file_type = self.record_file_type(entry, code);
        Ok(FileTypeResult {
            file_type,
            report: unsafe { report.copy(entry.name()) },
        })
    }

    /// Configured display name of a file type code
    pub fn file_type_name(&self, code: FileTypeCode) -> Option<&str> {
        self.core.file_types.name(code)
    }

    // Library information

    /// `GWFileVersion`: engine library version
    pub fn file_version(&mut self) -> BindResult<TextResult> {
        let entry = EntryPoint::FileVersion;
        let f: WideOutFn = self.core.bind(entry)?;
        let ctx = self.core.marshal(entry);

        let ptr = unsafe { f() };
        self.core.state = CallState::AfterOperation(entry);
        let text = unsafe { ctx.wide_out(0, ptr, None)? };
        debug!(entry_point = %entry, version = ?text, "engine call");
        Ok(TextResult { text })
    }

    // Shared call shapes

    fn no_arg(&mut self, entry: EntryPoint) -> BindResult<Status> {
        let f: NoArgFn = self.core.bind(entry)?;
        let code = unsafe { f() };
        Ok(self.core.record(entry, code))
    }

    fn file_to_memory(
        &mut self,
        entry: EntryPoint,
        input: &Path,
        file_type: &str,
    ) -> BindResult<BufferResult> {
        let f: FileToMemoryFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let input = ctx.path(0, input)?;
        let file_type = ctx.wide(1, file_type)?;

        let mut out = OutputBuffer::new();
        let code = unsafe { f(input, file_type, out.ptr_slot(), out.len_slot()) };
        let status = self.core.record(entry, code);
        debug!(entry_point = %entry, len = out.len(), "output buffer");

        let buffer = unsafe { out.copy_if(status.is_success(), entry.name()) };
        Ok(BufferResult { status, buffer })
    }

    fn file_to_file(
        &mut self,
        entry: EntryPoint,
        input: &Path,
        file_type: &str,
        output: &Path,
    ) -> BindResult<StatusResult> {
        let f: FileToFileFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let input = ctx.path(0, input)?;
        let file_type = ctx.wide(1, file_type)?;
        let output = ctx.path(2, output)?;

        let code = unsafe { f(input, file_type, output) };
        Ok(StatusResult {
            status: self.core.record(entry, code),
        })
    }

    fn path_pair(&mut self, entry: EntryPoint, first: &Path, second: &Path) -> BindResult<StatusResult> {
        let f: PathPairFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let first = ctx.path(0, first)?;
        let second = ctx.path(1, second)?;

        let code = unsafe { f(first, second) };
        Ok(StatusResult {
            status: self.core.record(entry, code),
        })
    }

    fn path_to_memory(&mut self, entry: EntryPoint, input: &Path) -> BindResult<BufferResult> {
        let f: PathToMemoryFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let input = ctx.path(0, input)?;

        let mut out = OutputBuffer::new();
        let code = unsafe { f(input, out.ptr_slot(), out.len_slot()) };
        let status = self.core.record(entry, code);

        let buffer = unsafe { out.copy_if(status.is_success(), entry.name()) };
        Ok(BufferResult { status, buffer })
    }

    fn file_to_memory_report(
        &mut self,
        entry: EntryPoint,
        input: &Path,
        file_type: &str,
    ) -> BindResult<BufferPlusReportResult> {
        let f: FileToMemoryReportFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let input = ctx.path(0, input)?;
        let file_type = ctx.wide(1, file_type)?;

        let mut out = OutputBuffer::new();
        let mut report = OutputBuffer::new();
        let code = unsafe {
            f(
                input,
                file_type,
                out.ptr_slot(),
                out.len_slot(),
                report.ptr_slot(),
                report.len_slot(),
            )
        };
        let status = self.core.record(entry, code);
        debug!(
            entry_point = %entry,
            len = out.len(),
            report_len = report.len(),
            "output buffers"
        );

        let buffer = unsafe { out.copy_if(status.is_success(), entry.name()) };
        let report = unsafe { report.copy(entry.name()) };
        Ok(BufferPlusReportResult {
            status,
            buffer,
            report,
        })
    }

    fn file_to_file_report(
        &mut self,
        entry: EntryPoint,
        input: &Path,
        file_type: &str,
        output: &Path,
        report: &Path,
    ) -> BindResult<StatusResult> {
        let f: FileToFileReportFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let input = ctx.path(0, input)?;
        let file_type = ctx.wide(1, file_type)?;
        let output = ctx.path(2, output)?;
        let report = ctx.path(3, report)?;

        let code = unsafe { f(input, file_type, output, report) };
        Ok(StatusResult {
            status: self.core.record(entry, code),
        })
    }

    fn memory_to_memory(
        &mut self,
        entry: EntryPoint,
        input: &[u8],
        file_type: &str,
    ) -> BindResult<BufferResult> {
        let f: MemoryToMemoryFn = self.core.bind(entry)?;
        let mut ctx = self.core.marshal(entry);
        let (data, len) = ctx.bytes(input);
        let file_type = ctx.wide(2, file_type)?;

        let mut out = OutputBuffer::new();
        let code = unsafe { f(data, len, file_type, out.ptr_slot(), out.len_slot()) };
        let status = self.core.record(entry, code);

        let buffer = unsafe { out.copy_if(status.is_success(), entry.name()) };
        Ok(BufferResult { status, buffer })
    }

    /// Determination calls return the type code where others return a status
    fn record_file_type(&mut self, entry: EntryPoint, code: i32) -> FileTypeCode {
        self.core.state = CallState::AfterOperation(entry);
        let file_type = FileTypeCode::new(code);
        debug!(
            entry_point = %entry,
            file_type = code,
            name = self.core.file_types.name(file_type),
            "engine call"
        );
        file_type
    }
}

/// Decode UTF-8 issue text, dropping the terminator some engines include
fn narrow_text(
    ctx: &MarshalContext,
    argument: usize,
    bytes: Option<Vec<u8>>,
) -> BindResult<Option<String>> {
    match bytes {
        Some(mut bytes) => {
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            Ok(Some(ctx.narrow(argument, bytes)?))
        }
        None => Ok(None),
    }
}
