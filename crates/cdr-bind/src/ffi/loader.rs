//! Engine library loading and entry point resolution
//!
//! Provides cross-platform dynamic library loading using `libloading`,
//! platform-specific library naming and search paths, and the
//! `LibraryHandle` that binds resolved symbols to their declared signatures.

use crate::error::{BindError, BindResult};
use crate::ffi::caller::{BoundEntryPoint, NativeFn, RawFn};
use crate::ffi::registry::SignatureRegistry;
use cdr_config::ConfigError;
use libloading::{Library, Symbol};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, trace};

/// Anything entry point addresses can be resolved from
pub trait SymbolSource: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Address of `symbol`, or `None` when it is not exported
    fn address(&self, symbol: &str) -> Option<RawFn>;
}

/// A native module loaded with `libloading`
///
/// # Safety
///
/// Loading a dynamic library runs its initialization code in this process.
/// The caller must ensure the library is trusted.
pub struct DynamicLibrary {
    label: String,
    library: Library,
}

impl DynamicLibrary {
    /// Load the module at `path`
    pub fn open(path: &Path) -> BindResult<Self> {
        let library = unsafe {
            Library::new(path).map_err(|e| BindError::Load {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        info!(path = %path.display(), "loaded engine library");
        Ok(Self {
            label: path.display().to_string(),
            library,
        })
    }
}

impl SymbolSource for DynamicLibrary {
    fn name(&self) -> &str {
        &self.label
    }

    fn address(&self, symbol: &str) -> Option<RawFn> {
        let found: Symbol<'_, *const ()> = unsafe { self.library.get(symbol.as_bytes()).ok()? };
        let address = RawFn::new(*found);
        if address.is_null() {
            None
        } else {
            Some(address)
        }
    }
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("label", &self.label)
            .finish()
    }
}

/// Explicit symbol name → address table
///
/// Used for engines linked into the process and for test doubles.
///
/// # Example
///
/// ```
/// # use cdr_bind::ffi::SymbolTable;
/// extern "C" fn done() -> i32 { 1 }
///
/// let table = SymbolTable::new("static-engine").with("GWFileDone", done as *const ());
/// assert_eq!(table.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    label: String,
    symbols: HashMap<String, RawFn>,
}

impl SymbolTable {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            symbols: HashMap::new(),
        }
    }

    /// Builder form of `insert`
    pub fn with(mut self, symbol: impl Into<String>, address: *const ()) -> Self {
        self.insert(symbol, address);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, address: *const ()) {
        self.symbols.insert(symbol.into(), RawFn::new(address));
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolSource for SymbolTable {
    fn name(&self) -> &str {
        &self.label
    }

    fn address(&self, symbol: &str) -> Option<RawFn> {
        self.symbols.get(symbol).copied().filter(|a| !a.is_null())
    }
}

/// Library search paths with platform-specific name resolution
#[derive(Debug, Clone)]
pub struct LibrarySearch {
    search_paths: Vec<PathBuf>,
}

impl LibrarySearch {
    /// Search the platform default locations
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Search `paths` first, then the platform default locations
    pub fn with_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut search_paths: Vec<PathBuf> = paths.into_iter().collect();
        search_paths.extend(Self::default_search_paths());
        Self { search_paths }
    }

    /// Get platform-specific default library search paths
    ///
    /// - Linux: /usr/lib, /usr/local/lib, /lib (plus lib64 variants)
    /// - macOS: /usr/lib, /usr/local/lib, /opt/homebrew/lib
    /// - Windows: System32
    /// - All platforms: current working directory first
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        #[cfg(target_os = "windows")]
        {
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            } else {
                paths.push(PathBuf::from("C:\\Windows\\System32"));
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// Add a search path ahead of all others
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Platform file names tried for a short library name, in priority order
    ///
    /// - Linux: lib{name}.so, {name}.so
    /// - macOS: lib{name}.dylib, lib{name}.so, {name}.dylib, {name}.so
    /// - Windows: {name}.dll, lib{name}.dll
    pub fn candidate_file_names(name: &str) -> Vec<String> {
        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };

        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        let mut names = Vec::new();
        for prefix in prefixes {
            for ext in extensions {
                names.push(format!("{}{}.{}", prefix, name, ext));
            }
        }
        // Already a full file name
        names.push(name.to_string());
        names
    }

    /// Resolve a path or short library name to an existing file
    pub fn resolve(&self, name: &str) -> BindResult<PathBuf> {
        let path = Path::new(name);
        if path.components().count() > 1 || path.is_absolute() {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(BindError::LibraryNotFound {
                name: name.to_string(),
                searched: vec![path.parent().map(Path::to_path_buf).unwrap_or_default()],
            });
        }

        let candidates = Self::candidate_file_names(name);
        for search_path in &self.search_paths {
            for file_name in &candidates {
                let full_path = search_path.join(file_name);
                trace!(candidate = %full_path.display(), "probing for engine library");
                if full_path.is_file() {
                    return Ok(full_path);
                }
            }
        }

        Err(BindError::LibraryNotFound {
            name: name.to_string(),
            searched: self.search_paths.clone(),
        })
    }
}

impl Default for LibrarySearch {
    fn default() -> Self {
        Self::new()
    }
}

/// When entry points are resolved against the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// All declared entry points at construction
    #[default]
    Eager,
    /// Each entry point on first use, then cached
    Lazy,
}

impl FromStr for ResolveMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eager" => Ok(ResolveMode::Eager),
            "lazy" => Ok(ResolveMode::Lazy),
            other => Err(ConfigError::InvalidValue {
                field: "library.resolve".to_string(),
                reason: format!("expected \"eager\" or \"lazy\", got \"{}\"", other),
            }),
        }
    }
}

/// Loaded engine module plus its bound entry points
///
/// Looking up the same name twice always yields the same bound entry point.
pub struct LibraryHandle {
    source: Box<dyn SymbolSource>,
    registry: SignatureRegistry,
    mode: ResolveMode,
    bound: HashMap<String, BoundEntryPoint>,
}

impl LibraryHandle {
    /// Load a library by path or short name with default search and eager resolution
    pub fn open(name: &str) -> BindResult<Self> {
        Self::open_with(name, &LibrarySearch::new(), ResolveMode::Eager)
    }

    /// Load a library by path or short name
    pub fn open_with(name: &str, search: &LibrarySearch, mode: ResolveMode) -> BindResult<Self> {
        let path = search.resolve(name)?;
        let library = DynamicLibrary::open(&path)?;
        Self::from_source(Box::new(library), SignatureRegistry::standard(), mode)
    }

    /// Bind entry points from any symbol source
    ///
    /// In `Eager` mode every declared entry point is resolved now, and the
    /// first missing one fails the whole construction.
    pub fn from_source(
        source: Box<dyn SymbolSource>,
        registry: SignatureRegistry,
        mode: ResolveMode,
    ) -> BindResult<Self> {
        let mut handle = Self {
            source,
            registry,
            mode,
            bound: HashMap::new(),
        };

        if mode == ResolveMode::Eager {
            handle.resolve_all()?;
        }
        Ok(handle)
    }

    /// Resolve every declared entry point not yet bound
    pub fn resolve_all(&mut self) -> BindResult<()> {
        let names: Vec<String> = self.registry.names().map(str::to_string).collect();
        for name in names {
            self.entry_point(&name)?;
        }
        info!(
            library = self.source.name(),
            entry_points = self.bound.len(),
            "resolved engine entry points"
        );
        Ok(())
    }

    /// Bound entry point for `name`, resolving it on first use
    pub fn entry_point(&mut self, name: &str) -> BindResult<&BoundEntryPoint> {
        match self.bound.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let bound = resolve_entry_point(&self.registry, self.source.as_ref(), name)?;
                Ok(entry.insert(bound))
            }
        }
    }

    /// Entry point cast to the function type used at the call site
    pub fn bind<F: NativeFn>(&mut self, name: &str) -> BindResult<F> {
        self.entry_point(name)?.cast::<F>()
    }

    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    /// Registry for declaring additional entry points, bound on first use
    pub fn registry_mut(&mut self) -> &mut SignatureRegistry {
        &mut self.registry
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    pub fn library_name(&self) -> &str {
        self.source.name()
    }

    /// Number of entry points bound so far
    pub fn resolved_count(&self) -> usize {
        self.bound.len()
    }
}

fn resolve_entry_point(
    registry: &SignatureRegistry,
    source: &dyn SymbolSource,
    name: &str,
) -> BindResult<BoundEntryPoint> {
    let signature = registry
        .get(name)
        .ok_or_else(|| BindError::UndeclaredEntryPoint(name.to_string()))?
        .clone();

    let address = source
        .address(name)
        .ok_or_else(|| BindError::SymbolNotFound {
            library: source.name().to_string(),
            symbol: name.to_string(),
        })?;

    trace!(entry_point = name, %signature, "resolved entry point");

    // Safety: the registry holds the engine's fixed ABI for this name
    Ok(unsafe { BoundEntryPoint::new(name, address, signature) })
}

impl fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("library", &self.source.name())
            .field("mode", &self.mode)
            .field("resolved", &self.bound.len())
            .finish()
    }
}
