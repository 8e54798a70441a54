//! Headless run: a client walks a short line of stations while the full
//! recording is exported after every step.
//!
//! Run with: `RUST_LOG=debug cargo run -p animflow-core --example headless_run`

use std::sync::Arc;

use animflow_core::config::AnimatorConfig;
use animflow_core::engine::Animator;
use animflow_core::entity::ClientRef;
use animflow_core::geometry::Bounds;
use animflow_core::id::StationId;
use animflow_core::model::{StationKind, SurfaceModel};
use animflow_core::recording::RecordingLog;
use animflow_core::sim::{SimulationData, VariableSet};
use tracing_subscriber::EnvFilter;

/// A single client walking from station to station, one per second.
struct Walk {
    time: u64,
    client: ClientRef,
}

impl SimulationData for Walk {
    fn current_time(&self) -> u64 {
        self.time
    }

    fn clients_in_use(&self) -> Vec<ClientRef> {
        vec![self.client.clone()]
    }

    fn variables(&self) -> VariableSet {
        VariableSet::new().with("Time", self.time as f64 / 1000.0)
    }

    fn client_type_names(&self) -> Vec<String> {
        vec!["Visitor".into()]
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut model = SurfaceModel::new();
    for i in 1..=4 {
        model.add_station(StationId(i), format!("Desk {i}"), StationKind::Box, Bounds::new((i as i32 - 1) * 200, 0, 100, 50));
        if i > 1 {
            model.connect(StationId(i - 1), StationId(i), None);
        }
    }

    let config = AnimatorConfig {
        min_frame_interval_ms: 0,
        ..AnimatorConfig::default()
    };
    let mut animator = Animator::headless(Arc::new(model), config);
    animator.set_full_recording(true);

    let mut sim = Walk {
        time: 0,
        client: ClientRef::new(1),
    };
    let mut log = RecordingLog::new();
    for to in 2..=4 {
        sim.time += 1_000;
        sim.client = ClientRef::moving(1, StationId(to - 1), StationId(to));
        let client = sim.client.clone();
        animator.process_client(&sim, Some(&client), 20);

        let step = animator.animation_step_info(sim.time, &sim.client_type_names());
        println!(
            "t={}s moving={} samples={}",
            step.time / 1000,
            step.moving.len(),
            step.moving.iter().map(|m| m.samples.len()).sum::<usize>()
        );
        log.push(step);
    }

    let bytes = log.encode()?;
    println!("recorded {} steps in {} bytes", log.len(), bytes.len());
    println!("time at end: {:?}", animator.calculate_expression("Time"));
    println!("frames: {:?}", animator.frame_stats());
    Ok(())
}
