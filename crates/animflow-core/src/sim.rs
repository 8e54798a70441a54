//! The animator's view of a running simulation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{ClientRef, OperatorRef, TransporterRef};

/// Snapshot of named simulation values used by breakpoint conditions,
/// display readouts and [`calculate_expression`].
///
/// [`calculate_expression`]: crate::engine::Animator::calculate_expression
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSet {
    values: BTreeMap<String, f64>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Read access to the simulation the animator is driven by.
///
/// Called only from the simulation thread, between events. Every method
/// returns snapshots; nothing borrowed from the simulation outlives a call.
pub trait SimulationData {
    /// Current simulation time in milliseconds.
    fn current_time(&self) -> u64;

    /// Clients currently in the system.
    fn clients_in_use(&self) -> Vec<ClientRef>;

    fn operators(&self) -> Vec<OperatorRef> {
        Vec::new()
    }

    fn transporters(&self) -> Vec<TransporterRef> {
        Vec::new()
    }

    /// Named values expressions may refer to.
    fn variables(&self) -> VariableSet;

    /// Client type names, indexed by [`ClientRef::client_type`].
    fn client_type_names(&self) -> Vec<String> {
        Vec::new()
    }
}
