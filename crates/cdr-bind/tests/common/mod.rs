//! Fake engine shared by the integration tests
//!
//! Every entry point of the engine ABI is implemented as an `extern "C"` Rust
//! function with the exact native signature and registered through a
//! `SymbolTable`. Like the real engine it keeps call-scoped state and owns
//! its output buffers until the next call. Each function also records whether
//! it was entered while another call was still running.
//!
//! Behavior:
//! - Input starting with `%CONFORM` is conforming; anything else is not
//! - Protect returns the input unchanged, audit returns a small XML analysis
//! - Export prefixes `ARCHIVE:`, import strips it
//! - Input starting with `%PDF` or `%CONFORM` has file type `PDF_TYPE_CODE`
//! - Wide strings are UTF-16

#![allow(dead_code)]

use cdr_bind::ffi::{WidePtr, WideUnit};
use cdr_bind::{Engine, EngineBuilder, ResolveMode, SymbolTable, WideEncoding};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub use pretty_assertions::{assert_eq, assert_ne};

pub const SUCCESS: i32 = 1;
pub const FAILURE: i32 = 0;
pub const CONFORMING_MAGIC: &[u8] = b"%CONFORM";
pub const ARCHIVE_MAGIC: &[u8] = b"ARCHIVE:";
pub const PDF_TYPE_CODE: i32 = 16;
pub const UNKNOWN_TYPE_CODE: i32 = 0;
pub const DEFAULT_CONFIG: &str = "<config><pdfConfig/></config>";
pub const VERSION_TEXT: &str = "1.0.0-fake";
pub const KNOWN_ISSUE_ID: u32 = 96;
pub const KNOWN_ISSUE_TEXT: &str = "Document Processing Instances";
pub const INVALID_UTF8_ISSUE_ID: u32 = 0xBAD;
pub const ALL_ID_INFO: &str = "<issues><group id=\"96\"/></issues>";
pub const PROCESS_STATUS_CLEAN: u32 = 0;
pub const PROCESS_STATUS_NON_CONFORMING: u32 = 0x10;

static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
static REENTERED: AtomicBool = AtomicBool::new(false);
static CALLS: AtomicUsize = AtomicUsize::new(0);
static DONE_CALLS: AtomicUsize = AtomicUsize::new(0);
static PROCESS_STATUS: AtomicU32 = AtomicU32::new(0);

/// Engine-owned memory, valid until the next call
struct EngineMemory {
    config: String,
    config_out: Vec<u16>,
    output: Vec<u8>,
    report: Vec<u8>,
    process_msg: Vec<u16>,
    error_msg: Vec<u16>,
    version: Vec<u16>,
}

static MEMORY: Mutex<EngineMemory> = Mutex::new(EngineMemory {
    config: String::new(),
    config_out: Vec::new(),
    output: Vec::new(),
    report: Vec::new(),
    process_msg: Vec::new(),
    error_msg: Vec::new(),
    version: Vec::new(),
});

fn memory() -> std::sync::MutexGuard<'static, EngineMemory> {
    MEMORY.lock().unwrap_or_else(|e| e.into_inner())
}

/// Marks one native call in flight
pub struct CallGuard;

impl CallGuard {
    pub fn enter() -> Self {
        if IN_FLIGHT.fetch_add(1, Ordering::SeqCst) != 0 {
            REENTERED.store(true, Ordering::SeqCst);
        }
        CALLS.fetch_add(1, Ordering::SeqCst);
        CallGuard
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Clear all fake engine state
pub fn reset() {
    IN_FLIGHT.store(0, Ordering::SeqCst);
    REENTERED.store(false, Ordering::SeqCst);
    CALLS.store(0, Ordering::SeqCst);
    DONE_CALLS.store(0, Ordering::SeqCst);
    PROCESS_STATUS.store(0, Ordering::SeqCst);

    let mut mem = memory();
    mem.config = DEFAULT_CONFIG.to_string();
    mem.config_out.clear();
    mem.output.clear();
    mem.report.clear();
    mem.process_msg = to_wide("");
    mem.error_msg = to_wide("");
    mem.version = to_wide(VERSION_TEXT);
}

pub fn reentered() -> bool {
    REENTERED.load(Ordering::SeqCst)
}

pub fn call_count() -> usize {
    CALLS.load(Ordering::SeqCst)
}

pub fn done_calls() -> usize {
    DONE_CALLS.load(Ordering::SeqCst)
}

/// Symbol table holding every fake entry point
pub fn fake_symbols() -> SymbolTable {
    SymbolTable::new("fake-engine")
        .with("GWFileConfigXML", gw_file_config_xml as *const ())
        .with("GWFileConfigGet", gw_file_config_get as *const ())
        .with(
            "GWFileConfigRevertToDefaults",
            gw_file_config_revert_to_defaults as *const (),
        )
        .with("GWGetIdInfo", gw_get_id_info as *const ())
        .with("GWGetAllIdInfo", gw_get_all_id_info as *const ())
        .with("GWFileProtect", gw_file_protect as *const ())
        .with("GWFileProtectLite", gw_file_protect_lite as *const ())
        .with("GWFileAnalysisAudit", gw_file_analysis_audit as *const ())
        .with("GWFileToFileProtect", gw_file_to_file_protect as *const ())
        .with("GWFileToFileProtectLite", gw_file_to_file_protect_lite as *const ())
        .with(
            "GWFileToFileAnalysisAudit",
            gw_file_to_file_analysis_audit as *const (),
        )
        .with(
            "GWFileToFileAnalysisProtectAndExport",
            gw_file_to_file_analysis_protect_and_export as *const (),
        )
        .with(
            "GWFileToFileProtectAndImport",
            gw_file_to_file_protect_and_import as *const (),
        )
        .with(
            "GWFileToMemoryAnalysisProtectAndExport",
            gw_file_to_memory_analysis_protect_and_export as *const (),
        )
        .with(
            "GWFileToMemoryProtectAndImport",
            gw_file_to_memory_protect_and_import as *const (),
        )
        .with("GWFileProtectAndReport", gw_file_protect_and_report as *const ())
        .with(
            "GWFileProtectLiteAndReport",
            gw_file_protect_lite_and_report as *const (),
        )
        .with(
            "GWFileAnalysisAuditAndReport",
            gw_file_analysis_audit_and_report as *const (),
        )
        .with(
            "GWFileToFileProtectAndReport",
            gw_file_to_file_protect_and_report as *const (),
        )
        .with(
            "GWFileToFileProtectLiteAndReport",
            gw_file_to_file_protect_lite_and_report as *const (),
        )
        .with(
            "GWFileToFileAnalysisAuditAndReport",
            gw_file_to_file_analysis_audit_and_report as *const (),
        )
        .with("GWMemoryToMemoryProtect", gw_memory_to_memory_protect as *const ())
        .with(
            "GWMemoryToMemoryAnalysisAudit",
            gw_memory_to_memory_analysis_audit as *const (),
        )
        .with(
            "GWDetermineFileTypeFromFile",
            gw_determine_file_type_from_file as *const (),
        )
        .with(
            "GWDetermineFileTypeFromFileAndReport",
            gw_determine_file_type_from_file_and_report as *const (),
        )
        .with(
            "GWDetermineFileTypeFromFileInMem",
            gw_determine_file_type_from_file_in_mem as *const (),
        )
        .with(
            "GWDetermineFileTypeFromFileInMemAndReport",
            gw_determine_file_type_from_file_in_mem_and_report as *const (),
        )
        .with("GWFileProcessStatus", gw_file_process_status as *const ())
        .with("GWFileProcessMsg", gw_file_process_msg as *const ())
        .with("GWFileErrorMsg", gw_file_error_msg as *const ())
        .with("GWFileVersion", gw_file_version as *const ())
        .with("GWFileDone", gw_file_done as *const ())
}

/// Fake symbols minus one entry point
pub fn fake_symbols_without(missing: &str) -> SymbolTable {
    let full = fake_symbols();
    let mut table = SymbolTable::new("fake-engine");
    for entry in cdr_bind::EntryPoint::ALL {
        if entry.name() != missing {
            if let Some(address) = cdr_bind::SymbolSource::address(&full, entry.name()) {
                table.insert(entry.name(), address.as_ptr());
            }
        }
    }
    table
}

/// Builder configured for the fake engine
pub fn fake_builder() -> EngineBuilder {
    EngineBuilder::new()
        .wide_encoding(WideEncoding::Utf16)
        .success_status(SUCCESS)
        .file_type_name(PDF_TYPE_CODE, "pdf")
}

/// Reset the fake and bind an engine to it
pub fn fake_engine() -> Engine {
    reset();
    fake_builder()
        .open_source(Box::new(fake_symbols()))
        .expect("fake engine binds")
}

/// Reset the fake and bind an engine resolving entry points lazily
pub fn lazy_fake_engine(symbols: SymbolTable) -> Engine {
    reset();
    fake_builder()
        .resolve_mode(ResolveMode::Lazy)
        .open_source(Box::new(symbols))
        .expect("fake engine binds")
}

/// Conforming fixture content
pub fn conforming_content() -> Vec<u8> {
    let mut content = CONFORMING_MAGIC.to_vec();
    content.extend_from_slice(b"\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n");
    content
}

/// Write a fixture file into `dir`
pub fn fixture(dir: &std::path::Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

// Helpers

fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

unsafe fn read_wide(ptr: WidePtr) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let base = ptr as *const u16;
    let mut len = 0;
    while *base.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(base, len))
}

unsafe fn read_path(ptr: WidePtr) -> PathBuf {
    PathBuf::from(read_wide(ptr))
}

unsafe fn read_bytes<'a>(data: *const u8, len: usize) -> &'a [u8] {
    if data.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(data, len)
    }
}

/// Simulated processing time so unserialized calls would overlap
fn work() {
    std::thread::sleep(Duration::from_micros(200));
}

fn is_conforming(content: &[u8]) -> bool {
    content.starts_with(CONFORMING_MAGIC)
}

#[derive(Clone, Copy)]
enum Mode {
    Protect,
    Audit,
}

/// Processing result and the call-scoped state it leaves behind
fn process(mode: Mode, content: &[u8]) -> Option<Vec<u8>> {
    work();
    let conforming = is_conforming(content);
    set_outcome(conforming);
    if !conforming {
        return None;
    }
    Some(match mode {
        Mode::Protect => content.to_vec(),
        Mode::Audit => format!("<analysis bytes=\"{}\"/>", content.len()).into_bytes(),
    })
}

fn set_outcome(conforming: bool) {
    let mut mem = memory();
    if conforming {
        PROCESS_STATUS.store(PROCESS_STATUS_CLEAN, Ordering::SeqCst);
        mem.process_msg = to_wide("processed");
        mem.error_msg = to_wide("");
    } else {
        PROCESS_STATUS.store(PROCESS_STATUS_NON_CONFORMING, Ordering::SeqCst);
        mem.process_msg = to_wide("rejected");
        mem.error_msg = to_wide("non-conforming input");
    }
}

fn report_for(content: &[u8]) -> Vec<u8> {
    format!(
        "<report conforming=\"{}\" bytes=\"{}\"/>",
        is_conforming(content),
        content.len()
    )
    .into_bytes()
}

fn read_file(path: &std::path::Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_default()
}

/// Write an artifact; missing parent directory creates nothing
fn write_artifact(path: &std::path::Path, data: &[u8]) -> i32 {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => FAILURE,
        _ => match std::fs::write(path, data) {
            Ok(()) => SUCCESS,
            Err(_) => FAILURE,
        },
    }
}

unsafe fn emit(slot: *mut *mut u8, slot_len: *mut usize, data: Option<Vec<u8>>, report: bool) -> bool {
    let mut mem = memory();
    let target = if report { &mut mem.report } else { &mut mem.output };
    match data {
        Some(bytes) => {
            *target = bytes;
            *slot = target.as_mut_ptr();
            *slot_len = target.len();
            true
        }
        None => {
            target.clear();
            *slot = std::ptr::null_mut();
            *slot_len = 0;
            false
        }
    }
}

fn status(ok: bool) -> i32 {
    if ok {
        SUCCESS
    } else {
        FAILURE
    }
}

// Configuration

pub extern "C" fn gw_file_config_xml(xml: WidePtr) -> i32 {
    let _guard = CallGuard::enter();
    let xml = unsafe { read_wide(xml) };
    if !xml.starts_with('<') {
        return FAILURE;
    }
    memory().config = xml;
    SUCCESS
}

pub extern "C" fn gw_file_config_get(out: *mut *mut WideUnit, out_len: *mut usize) -> i32 {
    let _guard = CallGuard::enter();
    let mut mem = memory();
    let wide = to_wide(&mem.config);
    mem.config_out = wide;
    unsafe {
        *out = mem.config_out.as_mut_ptr() as *mut WideUnit;
        *out_len = mem.config_out.len() - 1;
    }
    SUCCESS
}

pub extern "C" fn gw_file_config_revert_to_defaults() -> i32 {
    let _guard = CallGuard::enter();
    memory().config = DEFAULT_CONFIG.to_string();
    SUCCESS
}

// Issue IDs

pub extern "C" fn gw_get_id_info(issue_id: u32, out_len: *mut usize, out: *mut *mut u8) -> i32 {
    let _guard = CallGuard::enter();
    let text = match issue_id {
        KNOWN_ISSUE_ID => Some(KNOWN_ISSUE_TEXT.as_bytes().to_vec()),
        INVALID_UTF8_ISSUE_ID => Some(vec![0x47, 0xFF, 0xFE]),
        _ => None,
    };
    let ok = unsafe { emit(out, out_len, text, false) };
    status(ok)
}

pub extern "C" fn gw_get_all_id_info(out_len: *mut usize, out: *mut *mut u8) -> i32 {
    let _guard = CallGuard::enter();
    let mut text = ALL_ID_INFO.as_bytes().to_vec();
    text.push(0);
    unsafe { emit(out, out_len, Some(text), false) };
    SUCCESS
}

// File → Memory

fn file_to_memory(mode: Mode, input: WidePtr, out: *mut *mut u8, out_len: *mut usize) -> i32 {
    let _guard = CallGuard::enter();
    let content = read_file(&unsafe { read_path(input) });
    let result = process(mode, &content);
    status(unsafe { emit(out, out_len, result, false) })
}

pub extern "C" fn gw_file_protect(
    input: WidePtr,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    file_to_memory(Mode::Protect, input, out, out_len)
}

pub extern "C" fn gw_file_protect_lite(
    input: WidePtr,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    file_to_memory(Mode::Protect, input, out, out_len)
}

pub extern "C" fn gw_file_analysis_audit(
    input: WidePtr,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    file_to_memory(Mode::Audit, input, out, out_len)
}

// File → File

fn file_to_file(mode: Mode, input: WidePtr, output: WidePtr) -> i32 {
    let _guard = CallGuard::enter();
    let content = read_file(&unsafe { read_path(input) });
    let output = unsafe { read_path(output) };
    match process(mode, &content) {
        Some(data) => write_artifact(&output, &data),
        None => FAILURE,
    }
}

pub extern "C" fn gw_file_to_file_protect(input: WidePtr, _file_type: WidePtr, output: WidePtr) -> i32 {
    file_to_file(Mode::Protect, input, output)
}

pub extern "C" fn gw_file_to_file_protect_lite(
    input: WidePtr,
    _file_type: WidePtr,
    output: WidePtr,
) -> i32 {
    file_to_file(Mode::Protect, input, output)
}

pub extern "C" fn gw_file_to_file_analysis_audit(
    input: WidePtr,
    _file_type: WidePtr,
    output: WidePtr,
) -> i32 {
    file_to_file(Mode::Audit, input, output)
}

// Export / import

fn export(content: &[u8]) -> Option<Vec<u8>> {
    let protected = process(Mode::Protect, content)?;
    let mut archive = ARCHIVE_MAGIC.to_vec();
    archive.extend_from_slice(&protected);
    Some(archive)
}

fn import(archive: &[u8]) -> Option<Vec<u8>> {
    work();
    let restored = archive.strip_prefix(ARCHIVE_MAGIC).map(<[u8]>::to_vec);
    set_outcome(restored.is_some());
    restored
}

pub extern "C" fn gw_file_to_file_analysis_protect_and_export(input: WidePtr, export_path: WidePtr) -> i32 {
    let _guard = CallGuard::enter();
    let content = read_file(&unsafe { read_path(input) });
    match export(&content) {
        Some(archive) => write_artifact(&unsafe { read_path(export_path) }, &archive),
        None => FAILURE,
    }
}

pub extern "C" fn gw_file_to_file_protect_and_import(archive: WidePtr, output: WidePtr) -> i32 {
    let _guard = CallGuard::enter();
    let archive = read_file(&unsafe { read_path(archive) });
    match import(&archive) {
        Some(content) => write_artifact(&unsafe { read_path(output) }, &content),
        None => FAILURE,
    }
}

pub extern "C" fn gw_file_to_memory_analysis_protect_and_export(
    input: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    let _guard = CallGuard::enter();
    let content = read_file(&unsafe { read_path(input) });
    status(unsafe { emit(out, out_len, export(&content), false) })
}

pub extern "C" fn gw_file_to_memory_protect_and_import(
    archive: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    let _guard = CallGuard::enter();
    let archive = read_file(&unsafe { read_path(archive) });
    status(unsafe { emit(out, out_len, import(&archive), false) })
}

// File → Memory with report

fn file_to_memory_report(
    mode: Mode,
    input: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
    report: *mut *mut u8,
    report_len: *mut usize,
) -> i32 {
    let _guard = CallGuard::enter();
    let content = read_file(&unsafe { read_path(input) });
    let result = process(mode, &content);
    unsafe { emit(report, report_len, Some(report_for(&content)), true) };
    status(unsafe { emit(out, out_len, result, false) })
}

pub extern "C" fn gw_file_protect_and_report(
    input: WidePtr,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
    report: *mut *mut u8,
    report_len: *mut usize,
) -> i32 {
    file_to_memory_report(Mode::Protect, input, out, out_len, report, report_len)
}

pub extern "C" fn gw_file_protect_lite_and_report(
    input: WidePtr,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
    report: *mut *mut u8,
    report_len: *mut usize,
) -> i32 {
    file_to_memory_report(Mode::Protect, input, out, out_len, report, report_len)
}

pub extern "C" fn gw_file_analysis_audit_and_report(
    input: WidePtr,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
    report: *mut *mut u8,
    report_len: *mut usize,
) -> i32 {
    file_to_memory_report(Mode::Audit, input, out, out_len, report, report_len)
}

// File → File with report

fn file_to_file_report(mode: Mode, input: WidePtr, output: WidePtr, report: WidePtr) -> i32 {
    let _guard = CallGuard::enter();
    let content = read_file(&unsafe { read_path(input) });
    let report_status = write_artifact(&unsafe { read_path(report) }, &report_for(&content));
    match process(mode, &content) {
        Some(data) if report_status == SUCCESS => write_artifact(&unsafe { read_path(output) }, &data),
        _ => FAILURE,
    }
}

pub extern "C" fn gw_file_to_file_protect_and_report(
    input: WidePtr,
    _file_type: WidePtr,
    output: WidePtr,
    report: WidePtr,
) -> i32 {
    file_to_file_report(Mode::Protect, input, output, report)
}

pub extern "C" fn gw_file_to_file_protect_lite_and_report(
    input: WidePtr,
    _file_type: WidePtr,
    output: WidePtr,
    report: WidePtr,
) -> i32 {
    file_to_file_report(Mode::Protect, input, output, report)
}

pub extern "C" fn gw_file_to_file_analysis_audit_and_report(
    input: WidePtr,
    _file_type: WidePtr,
    output: WidePtr,
    report: WidePtr,
) -> i32 {
    file_to_file_report(Mode::Audit, input, output, report)
}

// Memory → Memory

fn memory_to_memory(mode: Mode, data: *const u8, len: usize, out: *mut *mut u8, out_len: *mut usize) -> i32 {
    let _guard = CallGuard::enter();
    let content = unsafe { read_bytes(data, len) };
    let result = process(mode, content);
    status(unsafe { emit(out, out_len, result, false) })
}

pub extern "C" fn gw_memory_to_memory_protect(
    data: *const u8,
    len: usize,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    memory_to_memory(Mode::Protect, data, len, out, out_len)
}

pub extern "C" fn gw_memory_to_memory_analysis_audit(
    data: *const u8,
    len: usize,
    _file_type: WidePtr,
    out: *mut *mut u8,
    out_len: *mut usize,
) -> i32 {
    memory_to_memory(Mode::Audit, data, len, out, out_len)
}

// File type determination

fn type_code(content: &[u8]) -> i32 {
    if content.starts_with(b"%PDF") || is_conforming(content) {
        PDF_TYPE_CODE
    } else {
        UNKNOWN_TYPE_CODE
    }
}

pub extern "C" fn gw_determine_file_type_from_file(path: WidePtr) -> i32 {
    let _guard = CallGuard::enter();
    type_code(&read_file(&unsafe { read_path(path) }))
}

pub extern "C" fn gw_determine_file_type_from_file_and_report(
    path: WidePtr,
    report: *mut *mut u8,
    report_len: *mut usize,
) -> i32 {
    let _guard = CallGuard::enter();
    let content = read_file(&unsafe { read_path(path) });
    unsafe { emit(report, report_len, Some(report_for(&content)), true) };
    type_code(&content)
}

pub extern "C" fn gw_determine_file_type_from_file_in_mem(data: *const u8, len: usize) -> i32 {
    let _guard = CallGuard::enter();
    type_code(unsafe { read_bytes(data, len) })
}

pub extern "C" fn gw_determine_file_type_from_file_in_mem_and_report(
    data: *const u8,
    len: usize,
    report: *mut *mut u8,
    report_len: *mut usize,
) -> i32 {
    let _guard = CallGuard::enter();
    let content = unsafe { read_bytes(data, len) };
    unsafe { emit(report, report_len, Some(report_for(content)), true) };
    type_code(content)
}

// Process status and messages

pub extern "C" fn gw_file_process_status(out: *mut u32) -> i32 {
    let _guard = CallGuard::enter();
    unsafe { *out = PROCESS_STATUS.load(Ordering::SeqCst) };
    SUCCESS
}

pub extern "C" fn gw_file_process_msg() -> WidePtr {
    let _guard = CallGuard::enter();
    memory().process_msg.as_ptr() as WidePtr
}

pub extern "C" fn gw_file_error_msg() -> WidePtr {
    let _guard = CallGuard::enter();
    memory().error_msg.as_ptr() as WidePtr
}

pub extern "C" fn gw_file_version() -> WidePtr {
    let _guard = CallGuard::enter();
    memory().version.as_ptr() as WidePtr
}

pub extern "C" fn gw_file_done() -> i32 {
    let _guard = CallGuard::enter();
    DONE_CALLS.fetch_add(1, Ordering::SeqCst);
    SUCCESS
}
