//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::config::AnimatorConfig;
use crate::entity::{ClientRef, OperatorRef, TransporterRef};
use crate::geometry::Bounds;
use crate::icons::DrawIcon;
use crate::id::StationId;
use crate::model::{StationKind, SurfaceModel};
use crate::render::Canvas;
use crate::sim::{SimulationData, VariableSet};

// ===========================================================================
// Scripted simulation
// ===========================================================================

/// A simulation whose state is set by the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSimulation {
    pub time: u64,
    pub clients: Vec<ClientRef>,
    pub operators: Vec<OperatorRef>,
    pub transporters: Vec<TransporterRef>,
    pub variables: VariableSet,
    pub client_types: Vec<String>,
}

impl ScriptedSimulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    pub fn with_client(mut self, client: ClientRef) -> Self {
        self.clients.push(client);
        self
    }

    pub fn with_operator(mut self, operator: OperatorRef) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn with_transporter(mut self, transporter: TransporterRef) -> Self {
        self.transporters.push(transporter);
        self
    }

    pub fn with_variable(mut self, name: &str, value: f64) -> Self {
        self.variables.set(name, value);
        self
    }

    pub fn with_client_types(mut self, names: &[&str]) -> Self {
        self.client_types = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Replace the client with the same key, or add it.
    pub fn upsert_client(&mut self, client: ClientRef) {
        match self.clients.iter_mut().find(|c| c.key == client.key) {
            Some(existing) => *existing = client,
            None => self.clients.push(client),
        }
    }
}

impl SimulationData for ScriptedSimulation {
    fn current_time(&self) -> u64 {
        self.time
    }

    fn clients_in_use(&self) -> Vec<ClientRef> {
        self.clients.clone()
    }

    fn operators(&self) -> Vec<OperatorRef> {
        self.operators.clone()
    }

    fn transporters(&self) -> Vec<TransporterRef> {
        self.transporters.clone()
    }

    fn variables(&self) -> VariableSet {
        self.variables.clone()
    }

    fn client_type_names(&self) -> Vec<String> {
        self.client_types.clone()
    }
}

// ===========================================================================
// Recording canvas
// ===========================================================================

/// Canvas that keeps every painted frame, optionally taking `delay` per
/// frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    frames: Arc<Mutex<Vec<Vec<DrawIcon>>>>,
    current: Vec<DrawIcon>,
    delay: Duration,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Painted frames so far. Clones share the log.
    pub fn frames(&self) -> Vec<Vec<DrawIcon>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Canvas for RecordingCanvas {
    fn begin_frame(&mut self) {
        self.current.clear();
    }

    fn draw_icon(&mut self, icon: &DrawIcon) {
        self.current.push(icon.clone());
    }

    fn end_frame(&mut self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let frame = std::mem::take(&mut self.current);
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
    }
}

// ===========================================================================
// Model builders
// ===========================================================================

pub fn station(id: u32) -> StationId {
    StationId(id)
}

/// Stations 1 (`A`) and 2 (`B`) connected directly, 300 px apart.
pub fn two_station_model() -> SurfaceModel {
    let mut model = SurfaceModel::new();
    model
        .add_station(station(1), "A", StationKind::Box, Bounds::new(0, 0, 100, 50))
        .add_station(station(2), "B", StationKind::Box, Bounds::new(300, 0, 100, 50))
        .connect(station(1), station(2), None);
    model
}

/// Stations 1 and 2 joined through vertices 10 and 11.
pub fn vertex_chain_model() -> SurfaceModel {
    let mut model = SurfaceModel::new();
    model
        .add_station(station(1), "A", StationKind::Box, Bounds::new(0, 0, 100, 50))
        .add_station(station(2), "B", StationKind::Box, Bounds::new(400, 200, 100, 50))
        .add_station(station(10), "", StationKind::Vertex, Bounds::new(200, 20, 10, 10))
        .add_station(station(11), "", StationKind::Vertex, Bounds::new(200, 220, 10, 10))
        .connect(station(1), station(10), None)
        .connect(station(10), station(11), None)
        .connect(station(11), station(2), None);
    model
}

/// Main-surface stations 1..=n in a row, each connected to the next.
pub fn line_model(n: u32) -> SurfaceModel {
    let mut model = SurfaceModel::new();
    for i in 1..=n {
        let x = (i as i32 - 1) * 200;
        model.add_station(station(i), format!("S{i}"), StationKind::Box, Bounds::new(x, 0, 100, 50));
        if i > 1 {
            model.connect(station(i - 1), station(i), None);
        }
    }
    model
}

/// Config for tests: inline painting, no throttling, minimal sleeps.
pub fn fast_config() -> AnimatorConfig {
    AnimatorConfig {
        min_frame_interval_ms: 0,
        sleep_granule_ms: 1,
        ..AnimatorConfig::default()
    }
}

/// Client `key` moving from `from` to `to`.
pub fn mover(key: u64, from: u32, to: u32) -> ClientRef {
    ClientRef::moving(key, station(from), station(to))
}
