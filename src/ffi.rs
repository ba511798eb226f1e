//! C ABI function exports for the circuit interpreter
//!
//! All functions use C-compatible types and follow a consistent naming convention.
//! Strings and errors returned to the caller must be released with
//! `circuit_sim_free_string` / `circuit_sim_free_error`.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::core::{CoreSimulator, SimState};
use crate::error::SimError;

// ============================================================================
// Simulator Context
// ============================================================================

/// Opaque simulator context passed to all FFI functions
pub struct CircuitSimContext {
    pub core: CoreSimulator,
}

impl CircuitSimContext {
    pub fn new(json: &str) -> Result<Self, SimError> {
        let core = CoreSimulator::from_json(json)?;
        Ok(Self { core })
    }
}

unsafe fn write_error(error_out: *mut *mut c_char, message: String) {
    if error_out.is_null() {
        return;
    }
    // Interior NULs cannot cross the boundary
    let message = message.replace('\0', " ");
    if let Ok(msg) = CString::new(message) {
        *error_out = msg.into_raw();
    }
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).map(CString::into_raw).unwrap_or(ptr::null_mut())
}

unsafe fn name_arg<'a>(name: *const c_char) -> Option<&'a str> {
    if name.is_null() {
        return None;
    }
    CStr::from_ptr(name).to_str().ok()
}

// ============================================================================
// Core FFI Functions
// ============================================================================

/// Create a new simulator from a JSON circuit description
/// Returns null on error, error message written to error_out if provided
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_create(
    json: *const c_char,
    json_len: usize,
    error_out: *mut *mut c_char,
) -> *mut CircuitSimContext {
    if json.is_null() {
        write_error(error_out, "Null JSON pointer".to_string());
        return ptr::null_mut();
    }
    let json_slice = slice::from_raw_parts(json as *const u8, json_len);
    let json_str = match std::str::from_utf8(json_slice) {
        Ok(s) => s,
        Err(e) => {
            write_error(error_out, format!("Invalid UTF-8 in JSON: {}", e));
            return ptr::null_mut();
        }
    };

    match CircuitSimContext::new(json_str) {
        Ok(ctx) => Box::into_raw(Box::new(ctx)),
        Err(e) => {
            write_error(error_out, e.to_string());
            ptr::null_mut()
        }
    }
}

/// Destroy a simulator
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_destroy(ctx: *mut CircuitSimContext) {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx));
    }
}

/// Free an error string returned through error_out
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_free_error(error: *mut c_char) {
    if !error.is_null() {
        drop(CString::from_raw(error));
    }
}

/// Free a string returned by circuit_sim functions
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Run every remaining cycle
/// Returns 0 on success, -1 on error
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_run(
    ctx: *mut CircuitSimContext,
    error_out: *mut *mut c_char,
) -> c_int {
    if ctx.is_null() {
        return -1;
    }
    match (*ctx).core.run() {
        Ok(_) => 0,
        Err(e) => {
            write_error(error_out, e.to_string());
            -1
        }
    }
}

/// Run the next cycle (cycle 0 on a fresh simulator)
/// Returns 0 on success, -1 on error
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_step(
    ctx: *mut CircuitSimContext,
    error_out: *mut *mut c_char,
) -> c_int {
    if ctx.is_null() {
        return -1;
    }
    let core = &mut (*ctx).core;
    let result = if core.state() == SimState::Uninitialized {
        core.initialize()
    } else {
        core.step()
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            write_error(error_out, e.to_string());
            -1
        }
    }
}

/// Peek a signal's current value
/// Returns 1 or 0, or -1 if the signal is unbound
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_peek(
    ctx: *const CircuitSimContext,
    name: *const c_char,
) -> c_int {
    if ctx.is_null() {
        return -1;
    }
    let name = match name_arg(name) {
        Some(s) => s,
        None => return -1,
    };

    match (*ctx).core.peek(name) {
        Ok(value) => value as c_int,
        Err(_) => -1,
    }
}

/// Recorded value of an output at a cycle
/// Returns 1 or 0, or -1 if the run has not terminated or the output/cycle is unknown
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_output_value(
    ctx: *const CircuitSimContext,
    name: *const c_char,
    cycle: usize,
) -> c_int {
    if ctx.is_null() {
        return -1;
    }
    let name = match name_arg(name) {
        Some(s) => s,
        None => return -1,
    };

    (*ctx)
        .core
        .output_trace(name)
        .and_then(|trace| trace.get(cycle))
        .map(|value| value as c_int)
        .unwrap_or(-1)
}

/// Simulation length (0 before cycle 0 has run)
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_sim_length(ctx: *const CircuitSimContext) -> usize {
    if ctx.is_null() {
        return 0;
    }
    (*ctx).core.sim_length()
}

/// Get output names (comma-separated, caller must free)
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_output_names(ctx: *const CircuitSimContext) -> *mut c_char {
    if ctx.is_null() {
        return ptr::null_mut();
    }
    into_c_string((*ctx).core.circuit().outputs.join(","))
}

/// Output traces as JSON (caller must free); null until the run has terminated
#[no_mangle]
pub unsafe extern "C" fn circuit_sim_outputs_json(ctx: *const CircuitSimContext) -> *mut c_char {
    if ctx.is_null() {
        return ptr::null_mut();
    }
    match (*ctx).core.outputs_json() {
        Ok(json) => into_c_string(json),
        Err(_) => ptr::null_mut(),
    }
}
