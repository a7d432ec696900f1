//! Call-scoped engine state
//!
//! The engine keeps the status and messages of its most recent operation in
//! process-global state. Any later call overwrites them, so they can only be
//! read meaningfully before the next operation. `CallState` makes that
//! explicit: construction starts in `Idle`, every operation moves to
//! `AfterOperation(op)`, and the accessors below read without transitioning.

use crate::error::BindResult;
use crate::ffi::registry::EntryPoint;
use crate::ffi::safety::OutputInt;
use crate::ffi::types::WidePtr;
use crate::results::{ProcessStatusResult, TextResult};
use crate::Session;
use serde::Serialize;
use std::fmt;
use tracing::debug;

type ProcessStatusFn = unsafe extern "C" fn(*mut u32) -> i32;
type MessageFn = unsafe extern "C" fn() -> WidePtr;

/// What the engine's call-scoped state currently describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CallState {
    /// No operation issued since construction
    #[default]
    Idle,
    /// State describes the given operation
    AfterOperation(EntryPoint),
}

impl CallState {
    /// The operation the engine state currently describes
    pub fn last_operation(&self) -> Option<EntryPoint> {
        match self {
            CallState::Idle => None,
            CallState::AfterOperation(op) => Some(*op),
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Idle => f.write_str("idle"),
            CallState::AfterOperation(op) => write!(f, "after {}", op),
        }
    }
}

/// Accessors for the engine's most recent operation.
///
/// Each reads the engine state without moving `CallState`, so calling one
/// twice in a row returns the same value. Issue them on the same `Session`
/// as the operation they describe; another operation in between replaces
/// what they report.
impl Session<'_> {
    /// Current call-state
    pub fn state(&self) -> CallState {
        self.core.state
    }

    /// Operation the accessors currently describe, if any
    pub fn last_operation(&self) -> Option<EntryPoint> {
        self.core.state.last_operation()
    }

    /// `GWFileProcessStatus`: engine process status of the last operation
    pub fn process_status(&mut self) -> BindResult<ProcessStatusResult> {
        let entry = EntryPoint::FileProcessStatus;
        let f: ProcessStatusFn = self.core.handle.bind(entry.name())?;

        let mut process_status = OutputInt::new();
        let code = unsafe { f(process_status.slot()) };
        debug!(
            entry_point = %entry,
            status = code,
            process_status = process_status.value(),
            state = %self.core.state,
            "read process status"
        );

        Ok(ProcessStatusResult {
            status: self.core.status(entry, code),
            process_status: process_status.value(),
        })
    }

    /// `GWFileProcessMsg`: process message of the last operation
    pub fn process_message(&mut self) -> BindResult<TextResult> {
        self.read_message(EntryPoint::FileProcessMsg)
    }

    /// `GWFileErrorMsg`: error message of the last operation
    pub fn error_message(&mut self) -> BindResult<TextResult> {
        self.read_message(EntryPoint::FileErrorMsg)
    }

    fn read_message(&mut self, entry: EntryPoint) -> BindResult<TextResult> {
        let f: MessageFn = self.core.handle.bind(entry.name())?;
        let ptr = unsafe { f() };

        let ctx = self.core.marshal(entry);
        let text = unsafe { ctx.wide_out(0, ptr, None)? };
        debug!(
            entry_point = %entry,
            present = text.is_some(),
            state = %self.core.state,
            "read engine message"
        );
        Ok(TextResult { text })
    }
}
