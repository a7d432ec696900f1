//! Engine calls through direct function pointers
//!
//! Every entry point has a fixed ABI, so the binding casts each resolved
//! symbol to a concrete `unsafe extern "C" fn` type instead of going through
//! a dynamic call interface. The Rust function type chosen at a call site
//! carries its own `CallSignature` (via `NativeArg`/`NativeReturn`), and a
//! cast only succeeds when that shape equals the declared one.

use crate::error::{BindError, BindResult};
use crate::ffi::types::{ArgKind, CallSignature, ReturnKind, WideUnit};

/// Rust ABI type usable as an engine argument
pub trait NativeArg: Copy {
    const KIND: ArgKind;
}

/// Rust ABI type usable as an engine return value
pub trait NativeReturn {
    const KIND: ReturnKind;
}

macro_rules! native_arg {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl NativeArg for $ty {
                const KIND: ArgKind = $kind;
            }
        )*
    };
}

native_arg! {
    i32 => ArgKind::FixedWidthInt(32),
    u32 => ArgKind::FixedWidthInt(32),
    *const WideUnit => ArgKind::WideString,
    *const u8 => ArgKind::BytePointer,
    usize => ArgKind::ByteLength,
    *mut *mut u8 => ArgKind::OutputBytePointer,
    *mut usize => ArgKind::OutputByteLength,
    *mut *mut WideUnit => ArgKind::OutputWidePointer,
    *mut u32 => ArgKind::OutputFixedWidthInt(32),
}

impl NativeReturn for i32 {
    const KIND: ReturnKind = ReturnKind::FixedWidthInt(32);
}

impl NativeReturn for *const WideUnit {
    const KIND: ReturnKind = ReturnKind::WidePointer;
}

/// Function pointer type that can stand for an engine entry point
///
/// # Safety
///
/// Implementors must be `unsafe extern "C" fn` pointer types whose argument
/// and return types are exactly those reported by `signature()`.
pub unsafe trait NativeFn: Copy {
    /// Shape of this function type
    fn signature() -> CallSignature;

    /// Reinterpret a symbol address as this function type
    ///
    /// # Safety
    ///
    /// `address` must be a non-null function with this exact ABI.
    unsafe fn from_address(address: *const ()) -> Self;
}

macro_rules! native_fn {
    ($($arg:ident),*) => {
        unsafe impl<R: NativeReturn, $($arg: NativeArg),*> NativeFn
            for unsafe extern "C" fn($($arg),*) -> R
        {
            fn signature() -> CallSignature {
                CallSignature::new(&[$(<$arg as NativeArg>::KIND),*], R::KIND)
            }

            unsafe fn from_address(address: *const ()) -> Self {
                std::mem::transmute_copy::<*const (), Self>(&address)
            }
        }
    };
}

native_fn!();
native_fn!(A);
native_fn!(A, B);
native_fn!(A, B, C);
native_fn!(A, B, C, D);
native_fn!(A, B, C, D, E);
native_fn!(A, B, C, D, E, F);

impl CallSignature {
    /// Signature of a Rust function pointer type
    pub fn of<F: NativeFn>() -> Self {
        F::signature()
    }
}

/// Type-erased symbol address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFn(*const ());

// Safety: RawFn only stores a code address, which is valid from any thread
unsafe impl Send for RawFn {}
unsafe impl Sync for RawFn {}

impl RawFn {
    pub fn new(address: *const ()) -> Self {
        Self(address)
    }

    pub fn as_ptr(&self) -> *const () {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// A resolved entry point: symbol address plus its declared signature
#[derive(Debug, Clone)]
pub struct BoundEntryPoint {
    name: String,
    address: RawFn,
    signature: CallSignature,
}

impl BoundEntryPoint {
    /// Pair a resolved address with its declared signature
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    /// - `address` points to a valid function
    /// - The function's actual ABI matches `signature`
    /// - The function remains valid for the lifetime of this value
    pub unsafe fn new(name: impl Into<String>, address: RawFn, signature: CallSignature) -> Self {
        Self {
            name: name.into(),
            address,
            signature,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    pub fn address(&self) -> RawFn {
        self.address
    }

    /// Cast to a concrete function type
    ///
    /// Fails with `SignatureMismatch` unless `F` has exactly the declared
    /// shape, so no call can be made through a wrongly typed pointer.
    pub fn cast<F: NativeFn>(&self) -> BindResult<F> {
        let bound = F::signature();
        if bound != self.signature {
            return Err(BindError::SignatureMismatch {
                entry_point: self.name.clone(),
                declared: self.signature.to_string(),
                bound: bound.to_string(),
            });
        }

        // Safety: the address was paired with this signature at construction
        Ok(unsafe { F::from_address(self.address.as_ptr()) })
    }
}
