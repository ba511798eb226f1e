//! Signal environment
//!
//! Current-cycle mapping from signal name to value. Created fresh for each
//! simulation run and owned by the simulator; latches, updates and the
//! expression evaluator borrow it for the duration of a single call.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Result, SimError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Environment {
    values: HashMap<String, bool>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Reading an unbound name is an error, never a default value.
    pub fn get(&self, name: &str) -> Result<bool> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| SimError::undefined(name))
    }

    pub fn set(&mut self, name: &str, value: bool) {
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
