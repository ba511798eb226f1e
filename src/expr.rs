//! Boolean expression trees
//!
//! Expressions are built from signal references combined with `and`, `or`
//! and `not`. Each update owns its own tree. Two operations walk a tree:
//! [`evaluate`] computes its value against the environment, [`check_defined`]
//! only verifies that every referenced signal is currently bound.

use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::{Result, SimError};

/// Expression node (JSON: tagged by `"type"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    Signal { name: String },
    And { left: Box<Expr>, right: Box<Expr> },
    Or { left: Box<Expr>, right: Box<Expr> },
    Not { operand: Box<Expr> },
}

impl Expr {
    pub fn signal(name: &str) -> Self {
        Expr::Signal {
            name: name.to_string(),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Not {
            operand: Box::new(operand),
        }
    }

    /// Nesting depth; a lone signal is 1. Walks iteratively.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((expr, level)) = stack.pop() {
            max = max.max(level);
            match expr {
                Expr::Signal { .. } => {}
                Expr::And { left, right } | Expr::Or { left, right } => {
                    stack.push((left, level + 1));
                    stack.push((right, level + 1));
                }
                Expr::Not { operand } => stack.push((operand, level + 1)),
            }
        }
        max
    }

    /// Referenced signal names, left to right, with repeats
    pub fn signals(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_signals(&mut out);
        out
    }

    fn collect_signals<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Signal { name } => out.push(name),
            Expr::And { left, right } | Expr::Or { left, right } => {
                left.collect_signals(out);
                right.collect_signals(out);
            }
            Expr::Not { operand } => operand.collect_signals(out),
        }
    }
}

/// Evaluate an expression against the current environment.
///
/// Both operands of a binary node are always evaluated, left first, so an
/// unbound signal on the right is reported even when the left operand
/// already decides the result.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<bool> {
    match expr {
        Expr::Signal { name } => env.get(name),
        Expr::And { left, right } => {
            let l = evaluate(left, env)?;
            let r = evaluate(right, env)?;
            Ok(l & r)
        }
        Expr::Or { left, right } => {
            let l = evaluate(left, env)?;
            let r = evaluate(right, env)?;
            Ok(l | r)
        }
        Expr::Not { operand } => Ok(!evaluate(operand, env)?),
    }
}

/// Verify every signal referenced by `expr` is bound, without evaluating.
pub fn check_defined(expr: &Expr, env: &Environment) -> Result<()> {
    match expr {
        Expr::Signal { name } => {
            if env.contains(name) {
                Ok(())
            } else {
                Err(SimError::undefined(name))
            }
        }
        Expr::And { left, right } | Expr::Or { left, right } => {
            check_defined(left, env)?;
            check_defined(right, env)
        }
        Expr::Not { operand } => check_defined(operand, env),
    }
}
