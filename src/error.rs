//! Simulation error types
//!
//! Every error is fatal for the run that produced it: the simulator moves to
//! `SimState::Failed` and no output trace is considered valid afterwards.

use thiserror::Error;

use crate::core::SimState;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// A name is declared more than once across inputs, latch outputs and update targets
    #[error("Signal declared more than once (inputs, latches or updates): {name}")]
    DuplicateSignalDeclaration { name: String },

    /// No input traces, an empty trace, or traces of different lengths
    #[error("Input traces are empty or of different lengths: {reason}")]
    EmptyOrMismatchedInputTimelines { reason: String },

    #[error("Input trace names an undeclared input: {signal}")]
    UnrecognizedInputTimelineSignal { signal: String },

    #[error("Signal '{name}' is not defined in the environment")]
    UndefinedSignal { name: String },

    /// Input stimuli must be fully defined before the run starts
    #[error("Input trace '{signal}' has no value at cycle {cycle}")]
    UnsetStimulus { signal: String, cycle: usize },

    #[error("Trace '{signal}' has {len} samples, cannot write cycle {cycle}")]
    CycleOutOfRange {
        signal: String,
        cycle: usize,
        len: usize,
    },

    /// Evaluation recurses once per level; deeper trees are rejected up front
    #[error("Expression for '{name}' is nested {depth} levels deep (limit {limit})")]
    ExpressionTooDeep {
        name: String,
        depth: usize,
        limit: usize,
    },

    #[error("Cannot {operation} while simulator is {state}")]
    InvalidTransition {
        state: SimState,
        operation: &'static str,
    },

    #[error("Failed to parse circuit JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub(crate) fn undefined(name: &str) -> Self {
        SimError::UndefinedSignal {
            name: name.to_string(),
        }
    }
}
