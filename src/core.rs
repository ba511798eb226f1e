//! Core cycle simulator
//!
//! Drives a validated `Circuit` through its simulation cycles against a
//! private `Environment`:
//!
//! - cycle 0 (initialize): bind inputs, reset latches, apply updates, record outputs
//! - cycle t (step): bind inputs, advance latches, apply updates, record outputs
//!
//! Latches advance together: every latch input is sampled before any latch
//! output is written.
//!
//! Any error moves the simulator to `SimState::Failed`, which is absorbing.

use log::{debug, error, info};
use serde::Serialize;
use std::fmt;

use crate::circuit::{advance_all, Circuit, Trace};
use crate::env::Environment;
use crate::error::{Result, SimError};

/// Simulator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimState {
    Uninitialized,
    Initialized,
    /// Cycle `t` (>= 1) has completed
    Stepped(usize),
    Terminated,
    Failed,
}

impl fmt::Display for SimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimState::Uninitialized => write!(f, "uninitialized"),
            SimState::Initialized => write!(f, "initialized"),
            SimState::Stepped(t) => write!(f, "stepped({})", t),
            SimState::Terminated => write!(f, "terminated"),
            SimState::Failed => write!(f, "failed"),
        }
    }
}

/// Structural counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimStats {
    pub input_count: usize,
    pub output_count: usize,
    pub latch_count: usize,
    pub update_count: usize,
    pub signal_count: usize,
}

pub struct CoreSimulator {
    circuit: Circuit,
    env: Environment,
    state: SimState,
    /// Common input trace length, fixed by validation
    sim_length: usize,
    /// One trace per declared output, in declaration order
    outputs: Vec<Trace>,
}

impl CoreSimulator {
    pub fn new(circuit: Circuit) -> Self {
        Self {
            circuit,
            env: Environment::new(),
            state: SimState::Uninitialized,
            sim_length: 0,
            outputs: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(Circuit::from_json(json)?))
    }

    /// Validate and run cycle 0.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != SimState::Uninitialized {
            return Err(self.invalid("initialize"));
        }
        let result = self.initialize_cycle();
        self.settle(result)
    }

    /// Run the next cycle.
    pub fn step(&mut self) -> Result<()> {
        let cycle = match self.state {
            SimState::Initialized => 1,
            SimState::Stepped(t) => t + 1,
            _ => return Err(self.invalid("step")),
        };
        let result = self.step_cycle(cycle);
        self.settle(result)
    }

    /// Run every remaining cycle and return the output traces.
    pub fn run(&mut self) -> Result<&[Trace]> {
        match self.state {
            SimState::Uninitialized => {
                info!("Simulating circuit '{}'", self.circuit.name);
                self.initialize()?;
            }
            SimState::Initialized | SimState::Stepped(_) => {}
            _ => return Err(self.invalid("run")),
        }

        while self.state != SimState::Terminated {
            self.step()?;
        }

        info!(
            "Circuit '{}' finished after {} cycles",
            self.circuit.name, self.sim_length
        );
        Ok(&self.outputs)
    }

    fn initialize_cycle(&mut self) -> Result<()> {
        self.sim_length = self.circuit.validate()?;
        debug!("cycle 0 (initialize), sim_length {}", self.sim_length);

        self.env = Environment::new();
        self.bind_inputs(0)?;
        for latch in &self.circuit.latches {
            latch.reset(&mut self.env);
        }
        self.apply_updates()?;

        self.outputs = self
            .circuit
            .outputs
            .iter()
            .map(|name| Trace::unset(name, self.sim_length))
            .collect();
        self.record_outputs(0)?;

        self.state = self.after_cycle(0);
        Ok(())
    }

    fn step_cycle(&mut self, cycle: usize) -> Result<()> {
        debug!("cycle {}", cycle);

        self.bind_inputs(cycle)?;
        advance_all(&self.circuit.latches, &mut self.env)?;
        self.apply_updates()?;
        self.record_outputs(cycle)?;

        self.state = self.after_cycle(cycle);
        Ok(())
    }

    fn after_cycle(&self, cycle: usize) -> SimState {
        if cycle + 1 >= self.sim_length {
            SimState::Terminated
        } else if cycle == 0 {
            SimState::Initialized
        } else {
            SimState::Stepped(cycle)
        }
    }

    fn bind_inputs(&mut self, cycle: usize) -> Result<()> {
        for trace in &self.circuit.siminputs {
            if !self.circuit.is_input(&trace.signal) {
                return Err(SimError::UnrecognizedInputTimelineSignal {
                    signal: trace.signal.clone(),
                });
            }
            let value = trace.get(cycle).ok_or_else(|| SimError::UnsetStimulus {
                signal: trace.signal.clone(),
                cycle,
            })?;
            self.env.set(&trace.signal, value);
        }
        Ok(())
    }

    // Declaration order; each update checks its references first
    fn apply_updates(&mut self) -> Result<()> {
        for update in &self.circuit.updates {
            update.apply(&mut self.env)?;
        }
        Ok(())
    }

    fn record_outputs(&mut self, cycle: usize) -> Result<()> {
        for trace in self.outputs.iter_mut() {
            let value = self.env.get(&trace.signal)?;
            trace.set(cycle, value)?;
        }
        Ok(())
    }

    fn settle(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            error!("Circuit '{}' failed: {}", self.circuit.name, e);
            self.state = SimState::Failed;
        }
        result
    }

    fn invalid(&self, operation: &'static str) -> SimError {
        SimError::InvalidTransition {
            state: self.state,
            operation,
        }
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Last completed cycle
    pub fn cycle(&self) -> Option<usize> {
        match self.state {
            SimState::Initialized => Some(0),
            SimState::Stepped(t) => Some(t),
            SimState::Terminated => Some(self.sim_length.saturating_sub(1)),
            SimState::Uninitialized | SimState::Failed => None,
        }
    }

    /// Zero until validation has run
    pub fn sim_length(&self) -> usize {
        self.sim_length
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn peek(&self, name: &str) -> Result<bool> {
        self.env.get(name)
    }

    /// Output traces, only once every cycle has run
    pub fn outputs(&self) -> Option<&[Trace]> {
        match self.state {
            SimState::Terminated => Some(&self.outputs),
            _ => None,
        }
    }

    pub fn output_trace(&self, name: &str) -> Option<&Trace> {
        self.outputs()?.iter().find(|trace| trace.signal == name)
    }

    pub fn outputs_json(&self) -> Result<String> {
        let outputs = self.outputs().ok_or_else(|| self.invalid("export outputs"))?;
        Ok(serde_json::to_string(outputs)?)
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            input_count: self.circuit.inputs.len(),
            output_count: self.circuit.outputs.len(),
            latch_count: self.circuit.latches.len(),
            update_count: self.circuit.updates.len(),
            signal_count: self.env.len(),
        }
    }
}
