//! Surface elements that show live simulation values.

use std::sync::{Arc, Mutex, PoisonError};

use crate::expr::Expression;
use crate::sim::SimulationData;

/// An element on the surface that reflects simulation state.
pub trait DisplayElement: Send {
    /// Called once before the first update of a run.
    fn init_animation(&mut self, _sim: &dyn SimulationData) {}

    /// Pull new data from the simulation. Returns `true` if the element's
    /// appearance changed and the surface needs a repaint.
    fn update_simulation_data(&mut self, sim: &dyn SimulationData, is_preview: bool) -> bool;
}

/// Read side of a readout's current value, for the code that draws it.
#[derive(Debug, Clone, Default)]
pub struct ReadoutHandle(Arc<Mutex<Option<f64>>>);

impl ReadoutHandle {
    pub fn get(&self) -> Option<f64> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, value: Option<f64>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// Shows the value of an expression, rounded to `digits` decimals.
///
/// Only a change visible at the shown precision counts as a change. The
/// readout stays as it is during preview updates.
#[derive(Debug)]
pub struct ExpressionReadout {
    expression: Option<Expression>,
    digits: u8,
    value: ReadoutHandle,
}

impl ExpressionReadout {
    /// A readout for `text`. Text that does not parse yields a readout that
    /// never shows a value.
    pub fn new(text: &str, digits: u8) -> Self {
        Self {
            expression: Expression::parse(text).ok(),
            digits,
            value: ReadoutHandle::default(),
        }
    }

    pub fn handle(&self) -> ReadoutHandle {
        self.value.clone()
    }
}

impl DisplayElement for ExpressionReadout {
    fn init_animation(&mut self, _sim: &dyn SimulationData) {
        self.value.set(None);
    }

    fn update_simulation_data(&mut self, sim: &dyn SimulationData, is_preview: bool) -> bool {
        if is_preview {
            return false;
        }
        let Some(expression) = &self.expression else {
            return false;
        };
        let Ok(value) = expression.evaluate(&sim.variables()) else {
            return false;
        };
        let threshold = 10f64.powi(-(i32::from(self.digits) + 1));
        let changed = self
            .value
            .get()
            .is_none_or(|old| (old - value).abs() >= threshold);
        if changed {
            self.value.set(Some(value));
        }
        changed
    }
}

/// Shows the simulation clock in whole seconds.
#[derive(Debug, Default)]
pub struct ClockReadout {
    value: ReadoutHandle,
}

impl ClockReadout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> ReadoutHandle {
        self.value.clone()
    }
}

impl DisplayElement for ClockReadout {
    fn update_simulation_data(&mut self, sim: &dyn SimulationData, _is_preview: bool) -> bool {
        let seconds = (sim.current_time() / 1000) as f64;
        if self.value.get() == Some(seconds) {
            return false;
        }
        self.value.set(Some(seconds));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ClientRef;
    use crate::sim::VariableSet;

    struct At {
        time: u64,
        wip: f64,
    }

    impl SimulationData for At {
        fn current_time(&self) -> u64 {
            self.time
        }

        fn clients_in_use(&self) -> Vec<ClientRef> {
            Vec::new()
        }

        fn variables(&self) -> VariableSet {
            VariableSet::new().with("WIP", self.wip)
        }
    }

    #[test]
    fn expression_readout_reports_visible_changes_only() {
        let mut r = ExpressionReadout::new("WIP * 2", 1);
        let handle = r.handle();
        assert!(r.update_simulation_data(&At { time: 0, wip: 1.0 }, false));
        assert_eq!(handle.get(), Some(2.0));
        // 0.002 is below the shown precision of one decimal.
        assert!(!r.update_simulation_data(&At { time: 0, wip: 1.001 }, false));
        assert!(r.update_simulation_data(&At { time: 0, wip: 1.5 }, false));
        assert_eq!(handle.get(), Some(3.0));
    }

    #[test]
    fn expression_readout_ignores_preview() {
        let mut r = ExpressionReadout::new("WIP", 0);
        assert!(!r.update_simulation_data(&At { time: 0, wip: 4.0 }, true));
        assert_eq!(r.handle().get(), None);
    }

    #[test]
    fn broken_expression_never_changes() {
        let mut r = ExpressionReadout::new("WIP +", 0);
        assert!(!r.update_simulation_data(&At { time: 0, wip: 4.0 }, false));
    }

    #[test]
    fn clock_ticks_per_second() {
        let mut c = ClockReadout::new();
        assert!(c.update_simulation_data(&At { time: 1_200, wip: 0.0 }, true));
        assert!(!c.update_simulation_data(&At { time: 1_900, wip: 0.0 }, true));
        assert!(c.update_simulation_data(&At { time: 2_000, wip: 0.0 }, false));
        assert_eq!(c.handle().get(), Some(2.0));
    }
}
