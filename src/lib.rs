//! Circuit Interpreter - cycle-accurate simulation of latch/update circuits
//!
//! This is a pure Rust library with C ABI exports.
//!
//! A circuit declares input and output signals, latches (one-cycle delays)
//! and updates (boolean assignments applied in declaration order). Given an
//! input trace for every stimulus signal, the simulator computes the value of
//! every signal at every cycle and records the traces of the declared outputs.
//!
//! The module is organized as:
//! - env.rs: Signal environment for the current cycle
//! - expr.rs: Expression trees, evaluation and definedness checking
//! - circuit.rs: Latches, updates, traces and structural validation
//! - core.rs: Cycle-stepping simulator and its state machine
//! - ffi.rs: C ABI function exports

pub mod circuit;
pub mod core;
pub mod env;
pub mod error;
pub mod expr;
mod ffi;

pub use circuit::{advance_all, Circuit, Latch, Trace, Update, MAX_EXPR_DEPTH};
pub use crate::core::{CoreSimulator, SimState, SimStats};
pub use env::Environment;
pub use error::{Result, SimError};
pub use expr::{check_defined, evaluate, Expr};

// Re-export FFI functions at crate root for easier linking
pub use ffi::*;
