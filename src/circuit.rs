//! Circuit structure: latches, updates, traces and the circuit aggregate
//!
//! A `Circuit` is built once (from JSON or programmatically) and never
//! mutated by the simulator. Structural validation lives here so it can run
//! before any cycle executes.

use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::env::Environment;
use crate::error::{Result, SimError};
use crate::expr::{check_defined, evaluate, Expr};

/// Deepest update expression accepted by `Circuit::validate`
pub const MAX_EXPR_DEPTH: usize = 1024;

/// One-cycle delay from `input` to `output`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latch {
    pub input: String,
    pub output: String,
}

impl Latch {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
        }
    }

    /// Power-on reset: output starts low.
    pub fn reset(&self, env: &mut Environment) {
        env.set(&self.output, false);
    }

    /// Read the input's current binding.
    pub fn sample(&self, env: &Environment) -> Result<bool> {
        env.get(&self.input)
    }

    pub fn store(&self, env: &mut Environment, value: bool) {
        trace!("latch {} <= {} ({})", self.output, self.input, value);
        env.set(&self.output, value);
    }

    /// Copy the input's current binding to the output.
    ///
    /// Must run after the cycle's inputs are bound and before any update is
    /// applied, so `input` still holds its value from the previous cycle.
    /// When latches feed each other, sample all of them before storing any
    /// (see [`advance_all`]).
    pub fn advance(&self, env: &mut Environment) -> Result<()> {
        let value = self.sample(env)?;
        self.store(env, value);
        Ok(())
    }
}

/// Advance every latch at once: all inputs are sampled before any output is
/// written, so a latch fed by another latch sees last cycle's value.
pub fn advance_all(latches: &[Latch], env: &mut Environment) -> Result<()> {
    let next: Vec<bool> = latches
        .iter()
        .map(|latch| latch.sample(env))
        .collect::<Result<_>>()?;

    for (latch, value) in latches.iter().zip(next) {
        latch.store(env, value);
    }
    Ok(())
}

/// Combinational assignment `name = expr`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub name: String,
    pub expr: Expr,
}

impl Update {
    pub fn new(name: &str, expr: Expr) -> Self {
        Self {
            name: name.to_string(),
            expr,
        }
    }

    /// Check, evaluate, write back.
    pub fn apply(&self, env: &mut Environment) -> Result<()> {
        check_defined(&self.expr, env)?;
        let value = evaluate(&self.expr, env)?;
        trace!("update {} = {}", self.name, value);
        env.set(&self.name, value);
        Ok(())
    }
}

/// Fixed-length sequence of samples for one signal. `None` is an unset sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub signal: String,
    pub values: Vec<Option<bool>>,
}

impl Trace {
    pub fn new(signal: &str, values: Vec<Option<bool>>) -> Self {
        Self {
            signal: signal.to_string(),
            values,
        }
    }

    /// Fully defined trace, as supplied for input stimuli
    pub fn from_bools(signal: &str, values: &[bool]) -> Self {
        Self::new(signal, values.iter().copied().map(Some).collect())
    }

    /// All samples unset
    pub fn unset(signal: &str, len: usize) -> Self {
        Self::new(signal, vec![None; len])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, cycle: usize) -> Option<bool> {
        self.values.get(cycle).copied().flatten()
    }

    /// Write one sample. The length is fixed; writing past it is an error.
    pub fn set(&mut self, cycle: usize, value: bool) -> Result<()> {
        let len = self.values.len();
        match self.values.get_mut(cycle) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(SimError::CycleOutOfRange {
                signal: self.signal.clone(),
                cycle,
                len,
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Complete circuit description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub latches: Vec<Latch>,
    /// Applied in this order every cycle
    #[serde(default)]
    pub updates: Vec<Update>,
    #[serde(default)]
    pub siminputs: Vec<Trace>,
}

impl Circuit {
    pub fn new(
        name: &str,
        inputs: Vec<String>,
        outputs: Vec<String>,
        latches: Vec<Latch>,
        updates: Vec<Update>,
        siminputs: Vec<Trace>,
    ) -> Self {
        Self {
            name: name.to_string(),
            inputs,
            outputs,
            latches,
            updates,
            siminputs,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        // serde_json's default recursion limit rejects over-deep expressions
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let circuit = Circuit::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(circuit)
    }

    pub fn is_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|input| input == name)
    }

    /// Structural checks. Returns the simulation length on success.
    pub fn validate(&self) -> Result<usize> {
        self.check_unique_names()?;
        let sim_length = self.check_trace_lengths()?;

        for update in &self.updates {
            let depth = update.expr.depth();
            if depth > MAX_EXPR_DEPTH {
                return Err(SimError::ExpressionTooDeep {
                    name: update.name.clone(),
                    depth,
                    limit: MAX_EXPR_DEPTH,
                });
            }
        }

        for trace in &self.siminputs {
            if !self.is_input(&trace.signal) {
                return Err(SimError::UnrecognizedInputTimelineSignal {
                    signal: trace.signal.clone(),
                });
            }
            if let Some(cycle) = trace.values.iter().position(Option::is_none) {
                return Err(SimError::UnsetStimulus {
                    signal: trace.signal.clone(),
                    cycle,
                });
            }
        }

        Ok(sim_length)
    }

    // Inputs, latch outputs and update targets share one namespace
    fn check_unique_names(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        let declared = self
            .inputs
            .iter()
            .map(String::as_str)
            .chain(self.latches.iter().map(|l| l.output.as_str()))
            .chain(self.updates.iter().map(|u| u.name.as_str()));

        for name in declared {
            if !seen.insert(name) {
                return Err(SimError::DuplicateSignalDeclaration {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_trace_lengths(&self) -> Result<usize> {
        let first = self.siminputs.first().ok_or_else(|| {
            SimError::EmptyOrMismatchedInputTimelines {
                reason: "no input traces supplied".to_string(),
            }
        })?;
        let length = first.len();

        for trace in &self.siminputs {
            if trace.is_empty() {
                return Err(SimError::EmptyOrMismatchedInputTimelines {
                    reason: format!("trace '{}' is empty", trace.signal),
                });
            }
            if trace.len() != length {
                return Err(SimError::EmptyOrMismatchedInputTimelines {
                    reason: format!(
                        "trace '{}' has length {}, expected {}",
                        trace.signal,
                        trace.len(),
                        length
                    ),
                });
            }
        }
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn inverter(siminputs: Vec<Trace>) -> Circuit {
        Circuit::new(
            "inv",
            names(&["a"]),
            names(&["out"]),
            vec![],
            vec![Update::new("out", Expr::not(Expr::signal("a")))],
            siminputs,
        )
    }

    #[test]
    fn test_latch_reset_and_advance() {
        let mut env = Environment::new();
        let latch = Latch::new("d", "q");
        latch.reset(&mut env);
        assert_eq!(env.get("q").unwrap(), false);

        env.set("d", true);
        latch.advance(&mut env).unwrap();
        assert_eq!(env.get("q").unwrap(), true);
    }

    #[test]
    fn test_advance_all_samples_before_storing() {
        // d -> q1 -> q2 shift register
        let latches = vec![Latch::new("d", "q1"), Latch::new("q1", "q2")];
        let mut env = Environment::new();
        for latch in &latches {
            latch.reset(&mut env);
        }
        env.set("d", true);

        advance_all(&latches, &mut env).unwrap();
        assert_eq!(env.get("q1").unwrap(), true);
        assert_eq!(env.get("q2").unwrap(), false);

        env.set("d", false);
        advance_all(&latches, &mut env).unwrap();
        assert_eq!(env.get("q1").unwrap(), false);
        assert_eq!(env.get("q2").unwrap(), true);
    }

    #[test]
    fn test_advance_all_writes_nothing_on_error() {
        let latches = vec![Latch::new("d", "q1"), Latch::new("missing", "q2")];
        let mut env = Environment::new();
        env.set("d", true);
        assert!(matches!(
            advance_all(&latches, &mut env),
            Err(SimError::UndefinedSignal { .. })
        ));
        assert!(!env.contains("q1"));
    }

    #[test]
    fn test_from_json_rejects_deep_nesting() {
        let depth = 200_000;
        let json = format!(
            r#"{{"name":"deep","inputs":["a"],"outputs":["y"],
                "updates":[{{"name":"y","expr":{}{}}}]}}"#,
            r#"{"type":"not","operand":"#.repeat(depth),
            format!(r#"{{"type":"signal","name":"a"}}{}"#, "}".repeat(depth)),
        );
        assert!(matches!(Circuit::from_json(&json), Err(SimError::Json(_))));
    }

    #[test]
    fn test_validate_rejects_deep_expression() {
        let mut expr = Expr::signal("a");
        for _ in 0..MAX_EXPR_DEPTH {
            expr = Expr::not(expr);
        }
        let circuit = inverter(vec![Trace::from_bools("a", &[true])]);
        let mut deep = circuit.clone();
        deep.updates[0].expr = expr;
        match deep.validate() {
            Err(SimError::ExpressionTooDeep { name, depth, limit }) => {
                assert_eq!(name, "out");
                assert_eq!(depth, MAX_EXPR_DEPTH + 1);
                assert_eq!(limit, MAX_EXPR_DEPTH);
            }
            other => panic!("expected ExpressionTooDeep, got {:?}", other),
        }
        assert_eq!(circuit.validate().unwrap(), 1);
    }

    #[test]
    fn test_latch_advance_unbound_input() {
        let mut env = Environment::new();
        let latch = Latch::new("d", "q");
        assert!(matches!(
            latch.advance(&mut env),
            Err(SimError::UndefinedSignal { .. })
        ));
    }

    #[test]
    fn test_update_apply_checks_before_writing() {
        let mut env = Environment::new();
        let update = Update::new("y", Expr::and(Expr::signal("a"), Expr::signal("b")));
        env.set("a", true);
        assert!(update.apply(&mut env).is_err());
        assert!(!env.contains("y"));

        env.set("b", true);
        update.apply(&mut env).unwrap();
        assert_eq!(env.get("y").unwrap(), true);
    }

    #[test]
    fn test_trace_writer() {
        let mut trace = Trace::unset("out", 3);
        assert!(!trace.is_complete());
        trace.set(0, true).unwrap();
        trace.set(1, false).unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.get(0), Some(true));
        assert_eq!(trace.get(2), None);
        trace.set(2, true).unwrap();
        assert!(trace.is_complete());
    }

    #[test]
    fn test_trace_write_past_end() {
        let mut trace = Trace::unset("out", 3);
        match trace.set(3, true) {
            Err(SimError::CycleOutOfRange { signal, cycle, len }) => {
                assert_eq!(signal, "out");
                assert_eq!(cycle, 3);
                assert_eq!(len, 3);
            }
            other => panic!("expected CycleOutOfRange, got {:?}", other),
        }
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.values, vec![None; 3]);
    }

    #[test]
    fn test_validate_returns_length() {
        let circuit = inverter(vec![Trace::from_bools("a", &[true, false, true])]);
        assert_eq!(circuit.validate().unwrap(), 3);
    }

    #[test]
    fn test_duplicate_across_groups() {
        let mut circuit = inverter(vec![Trace::from_bools("a", &[true])]);
        circuit.latches.push(Latch::new("out", "a"));
        match circuit.validate() {
            Err(SimError::DuplicateSignalDeclaration { name }) => assert_eq!(name, "a"),
            other => panic!("expected DuplicateSignalDeclaration, got {:?}", other),
        }

        let mut circuit = inverter(vec![Trace::from_bools("a", &[true])]);
        circuit.updates.push(Update::new("out", Expr::signal("a")));
        assert!(matches!(
            circuit.validate(),
            Err(SimError::DuplicateSignalDeclaration { .. })
        ));
    }

    #[test]
    fn test_trace_length_errors() {
        let circuit = inverter(vec![]);
        assert!(matches!(
            circuit.validate(),
            Err(SimError::EmptyOrMismatchedInputTimelines { .. })
        ));

        let circuit = inverter(vec![Trace::from_bools("a", &[])]);
        assert!(matches!(
            circuit.validate(),
            Err(SimError::EmptyOrMismatchedInputTimelines { .. })
        ));

        let mut circuit = inverter(vec![
            Trace::from_bools("a", &[true, false]),
            Trace::from_bools("b", &[true]),
        ]);
        circuit.inputs.push("b".to_string());
        assert!(matches!(
            circuit.validate(),
            Err(SimError::EmptyOrMismatchedInputTimelines { .. })
        ));
    }

    #[test]
    fn test_unrecognized_and_unset_stimulus() {
        let circuit = inverter(vec![
            Trace::from_bools("a", &[true]),
            Trace::from_bools("z", &[true]),
        ]);
        match circuit.validate() {
            Err(SimError::UnrecognizedInputTimelineSignal { signal }) => assert_eq!(signal, "z"),
            other => panic!("expected UnrecognizedInputTimelineSignal, got {:?}", other),
        }

        let circuit = inverter(vec![Trace::new("a", vec![Some(true), None])]);
        match circuit.validate() {
            Err(SimError::UnsetStimulus { signal, cycle }) => {
                assert_eq!(signal, "a");
                assert_eq!(cycle, 1);
            }
            other => panic!("expected UnsetStimulus, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_defaults() {
        let json = r#"{
            "name": "wire",
            "inputs": ["a"],
            "outputs": ["a"],
            "siminputs": [{"signal": "a", "values": [true, null]}]
        }"#;
        let circuit = Circuit::from_json(json).unwrap();
        assert!(circuit.latches.is_empty());
        assert!(circuit.updates.is_empty());
        assert_eq!(circuit.siminputs[0].values, vec![Some(true), None]);

        assert!(matches!(
            Circuit::from_json("{\"name\": 3}"),
            Err(SimError::Json(_))
        ));
    }
}
