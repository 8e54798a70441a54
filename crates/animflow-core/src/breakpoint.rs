//! Breakpoints: conditions on entity movements that pause the simulation.
//!
//! A breakpoint fires when an entity arrives at (or heads to) its station,
//! optionally filtered by client type and guarded by an expression over the
//! simulation's variables. The condition is parsed on first evaluation; a
//! condition that does not parse disables the breakpoint instead of
//! failing the run.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::Entity;
use crate::expr::Expression;
use crate::id::StationId;
use crate::sim::SimulationData;

#[derive(Debug, Clone, Default)]
enum CompiledCondition {
    #[default]
    Pending,
    Ready(Expression),
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakpoint {
    station: StationId,
    /// Client type index to match; `None` matches every entity.
    #[serde(default)]
    client_type: Option<usize>,
    #[serde(default)]
    condition: Option<String>,
    /// Remove the breakpoint after it fires once.
    #[serde(default)]
    auto_delete: bool,
    #[serde(skip)]
    compiled: CompiledCondition,
}

impl PartialEq for Breakpoint {
    fn eq(&self, other: &Self) -> bool {
        self.station == other.station
            && self.client_type == other.client_type
            && self.condition == other.condition
            && self.auto_delete == other.auto_delete
    }
}

impl Breakpoint {
    pub fn new(station: StationId) -> Self {
        Self {
            station,
            client_type: None,
            condition: None,
            auto_delete: false,
            compiled: CompiledCondition::Pending,
        }
    }

    pub fn with_client_type(mut self, client_type: usize) -> Self {
        self.client_type = Some(client_type);
        self
    }

    /// Guard the breakpoint with an expression. Blank text means no guard.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        self.condition = (!condition.trim().is_empty()).then_some(condition);
        self.compiled = CompiledCondition::Pending;
        self
    }

    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    pub fn station(&self) -> StationId {
        self.station
    }

    pub fn client_type(&self) -> Option<usize> {
        self.client_type
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn auto_delete(&self) -> bool {
        self.auto_delete
    }

    /// Copy without compiled state, for storing or handing out.
    fn detached(&self) -> Self {
        Self {
            compiled: CompiledCondition::Pending,
            ..self.clone()
        }
    }

    fn matches_entity(&self, entity: &Entity) -> bool {
        if entity.target_station() != Some(self.station) {
            return false;
        }
        match (self.client_type, entity) {
            (None, _) => true,
            (Some(wanted), Entity::Client(client)) => client.client_type == wanted,
            (Some(_), _) => false,
        }
    }

    /// Evaluate the guard. Called only after the entity matched.
    fn condition_holds(&mut self, sim: &dyn SimulationData) -> bool {
        let Some(text) = &self.condition else {
            return true;
        };
        if let CompiledCondition::Pending = self.compiled {
            self.compiled = match Expression::parse(text) {
                Ok(expr) => CompiledCondition::Ready(expr),
                Err(e) => {
                    warn!(station = %self.station, condition = %text, error = %e, "breakpoint condition does not parse, ignoring breakpoint");
                    CompiledCondition::Invalid
                }
            };
        }
        match &self.compiled {
            CompiledCondition::Ready(expr) => match expr.is_true(&sim.variables()) {
                Ok(holds) => holds,
                Err(e) => {
                    debug!(station = %self.station, error = %e, "breakpoint condition not evaluable");
                    false
                }
            },
            CompiledCondition::Invalid | CompiledCondition::Pending => false,
        }
    }
}

/// The installed breakpoints.
///
/// Reads and writes may come from any thread; the simulation thread tests
/// them on every movement.
#[derive(Debug, Default)]
pub struct BreakpointSet {
    list: Mutex<Vec<Breakpoint>>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Breakpoint>> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies of all breakpoints.
    pub fn get_all(&self) -> Vec<Breakpoint> {
        self.lock().iter().map(Breakpoint::detached).collect()
    }

    /// Replace all breakpoints with copies of `breakpoints`.
    pub fn set_all(&self, breakpoints: &[Breakpoint]) {
        *self.lock() = breakpoints.iter().map(Breakpoint::detached).collect();
    }

    /// Install, replace or (with `None`) remove the breakpoint at `station`.
    pub fn set_for_station(&self, station: StationId, breakpoint: Option<Breakpoint>) {
        let mut list = self.lock();
        list.retain(|b| b.station != station);
        if let Some(breakpoint) = breakpoint {
            let mut copy = breakpoint.detached();
            copy.station = station;
            list.push(copy);
        }
    }

    /// Whether `entity` triggers any breakpoint. The first matching
    /// breakpoint decides; auto-delete breakpoints are removed when they
    /// fire.
    pub fn test(&self, sim: &dyn SimulationData, entity: &Entity) -> bool {
        let mut list = self.lock();
        let fired = list
            .iter_mut()
            .position(|b| b.matches_entity(entity) && b.condition_holds(sim));
        let Some(index) = fired else {
            return false;
        };
        debug!(station = %list[index].station, kind = ?entity.kind(), key = entity.key().0, "breakpoint hit");
        if list[index].auto_delete {
            list.remove(index);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ClientRef, OperatorRef, TransporterRef};
    use crate::sim::VariableSet;
    use std::cell::Cell;

    struct Vars {
        wip: f64,
        reads: Cell<usize>,
    }

    impl SimulationData for Vars {
        fn current_time(&self) -> u64 {
            0
        }

        fn clients_in_use(&self) -> Vec<ClientRef> {
            Vec::new()
        }

        fn variables(&self) -> VariableSet {
            self.reads.set(self.reads.get() + 1);
            VariableSet::new().with("WIP", self.wip)
        }
    }

    fn sim(wip: f64) -> Vars {
        Vars {
            wip,
            reads: Cell::new(0),
        }
    }

    fn client(client_type: usize, to: u32) -> Entity {
        let mut c = ClientRef::moving(1, StationId(1), StationId(to));
        c.client_type = client_type;
        Entity::Client(c)
    }

    #[test]
    fn station_must_match() {
        let set = BreakpointSet::new();
        set.set_for_station(StationId(2), Some(Breakpoint::new(StationId(2))));
        assert!(set.test(&sim(0.0), &client(0, 2)));
        assert!(!set.test(&sim(0.0), &client(0, 3)));
    }

    #[test]
    fn client_type_filter() {
        let set = BreakpointSet::new();
        set.set_all(&[Breakpoint::new(StationId(2)).with_client_type(1)]);
        assert!(!set.test(&sim(0.0), &client(0, 2)));
        assert!(set.test(&sim(0.0), &client(1, 2)));
        let operator = Entity::Operator(OperatorRef {
            station: Some(StationId(2)),
            ..OperatorRef::default()
        });
        assert!(!set.test(&sim(0.0), &operator));
    }

    #[test]
    fn wildcard_matches_transporters() {
        let set = BreakpointSet::new();
        set.set_all(&[Breakpoint::new(StationId(4))]);
        let t = Entity::Transporter(TransporterRef {
            position: Some(StationId(4)),
            ..TransporterRef::default()
        });
        assert!(set.test(&sim(0.0), &t));
    }

    #[test]
    fn condition_guards_and_is_only_read_after_a_match() {
        let set = BreakpointSet::new();
        set.set_all(&[Breakpoint::new(StationId(2)).with_condition("WIP > 5")]);
        let low = sim(3.0);
        assert!(!set.test(&low, &client(0, 2)));
        assert!(set.test(&sim(6.0), &client(0, 2)));

        let other_station = sim(6.0);
        assert!(!set.test(&other_station, &client(0, 9)));
        assert_eq!(other_station.reads.get(), 0);
    }

    #[test]
    fn unparsable_condition_disables_breakpoint() {
        let set = BreakpointSet::new();
        set.set_all(&[Breakpoint::new(StationId(2)).with_condition("WIP >")]);
        assert!(!set.test(&sim(10.0), &client(0, 2)));
        assert!(!set.test(&sim(10.0), &client(0, 2)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn auto_delete_fires_once() {
        let set = BreakpointSet::new();
        set.set_all(&[Breakpoint::new(StationId(2)).with_auto_delete(true)]);
        assert!(set.test(&sim(0.0), &client(0, 2)));
        assert!(!set.test(&sim(0.0), &client(0, 2)));
        assert!(set.is_empty());
    }

    #[test]
    fn returned_copies_are_independent() {
        let set = BreakpointSet::new();
        set.set_all(&[Breakpoint::new(StationId(2))]);
        let mut copies = set.get_all();
        copies[0] = Breakpoint::new(StationId(7));
        assert_eq!(set.get_all()[0].station(), StationId(2));
    }

    #[test]
    fn set_for_station_replaces_and_removes() {
        let set = BreakpointSet::new();
        set.set_for_station(StationId(2), Some(Breakpoint::new(StationId(2))));
        set.set_for_station(StationId(2), Some(Breakpoint::new(StationId(2)).with_client_type(3)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_all()[0].client_type(), Some(3));
        set.set_for_station(StationId(2), None);
        assert!(set.is_empty());
    }

    #[test]
    fn blank_condition_means_unconditional() {
        let b = Breakpoint::new(StationId(1)).with_condition("   ");
        assert_eq!(b.condition(), None);
    }

    #[test]
    fn serde_skips_compiled_state() {
        let b = Breakpoint::new(StationId(1)).with_condition("WIP > 2").with_auto_delete(true);
        let json = serde_json::to_string(&b).unwrap();
        let back: Breakpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
