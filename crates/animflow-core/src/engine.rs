//! The animator: drives movements of simulation entities across the model
//! surface and keeps the shared scene in sync with the simulation.
//!
//! # Movement pipeline
//!
//! Each animated movement runs through these phases on the simulation
//! thread:
//!
//! 1. **Static rebuild** -- every entity not taking part in the movement is
//!    laid out at its station and published as the static list.
//! 2. **Paths** -- each mover's anchor chain is resolved (connection
//!    vertices for clients, way points for transporters) and turned into
//!    screen points via the route cache.
//! 3. **Steps** -- for every point index the moving list is replaced and a
//!    frame requested; the delay integrator paces the loop.
//! 4. **Settle** -- the moving list is cleared and the static list rebuilt
//!    with the movers at their new stations; display elements refresh and a
//!    final frame is painted.
//!
//! Path computation happens outside the scene lock; only publishing a list
//! takes it.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::breakpoint::{Breakpoint, BreakpointSet};
use crate::config::{AnimatorConfig, MoveMode, RenderMode};
use crate::display::DisplayElement;
use crate::entity::{ClientRef, Entity, EntityKind, EntityTag, OperatorRef, TransporterRef};
use crate::expr::Expression;
use crate::icons::{ActiveEntities, DrawIcon, Exclusions, StaticIconBuilder};
use crate::id::{EntityKey, StationId};
use crate::model::{StationKind, SurfaceModel};
use crate::pacer::{DelayIntegrator, FramePacer, FrameStats, InterruptHandle, PaintTarget};
use crate::path::{AnimationPath, partial_steps, steps_for_distance};
use crate::recording::StepInfo;
use crate::render::{Canvas, NullCanvas, RenderError, RenderThread};
use crate::route::RouteCache;
use crate::scene::SceneHandle;
use crate::sim::{SimulationData, VariableSet};
use crate::waypoint::WayPointRouter;

/// Returned by [`Animator::run_script`] before any simulation data was seen.
pub const NO_SIMULATION_DATA: &str = "No simulation data available.";

/// A pending client movement, fixed at the time it was reported.
///
/// If the client moves again before the animation runs, this still holds
/// the earlier move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveClient {
    pub client: ClientRef,
    pub from: StationId,
    pub to: StationId,
}

impl MoveClient {
    /// `None` unless the client has both a last and a next station.
    pub fn new(client: &ClientRef) -> Option<Self> {
        Some(Self {
            from: client.last_station?,
            to: client.next_station?,
            client: client.clone(),
        })
    }
}

/// Runs scripts against a variable snapshot on behalf of [`Animator::run_script`].
pub trait ScriptHook {
    fn run(&self, script: &str, variables: &VariableSet) -> String;
}

pub struct Animator {
    config: AnimatorConfig,
    model: Arc<SurfaceModel>,
    router: WayPointRouter,
    routes: RouteCache,
    statics: StaticIconBuilder,
    scene: SceneHandle,
    pacer: FramePacer,
    breakpoints: BreakpointSet,
    display_elements: Vec<Box<dyn DisplayElement>>,
    interrupt: InterruptHandle,

    clients: Vec<ClientRef>,
    operators: Vec<OperatorRef>,
    transporters: Vec<TransporterRef>,
    /// Variables as of the last painted frame.
    variables: Option<VariableSet>,

    first_update_step: bool,
    no_additional_frames: bool,
    slow_mode: bool,
    full_recording: bool,

    pending_moves: Vec<MoveClient>,
    last_multi_move_time: Option<u64>,
}

impl Animator {
    /// Create an animator painting onto `canvas`.
    ///
    /// In [`RenderMode::Concurrent`] the canvas moves onto a dedicated
    /// render thread.
    pub fn new(model: Arc<SurfaceModel>, config: AnimatorConfig, canvas: Box<dyn Canvas>) -> Result<Self, RenderError> {
        let config = config.sanitized();
        let scene = SceneHandle::new(config.icon_size);
        let target = match config.render_mode {
            RenderMode::Synchronous => PaintTarget::Inline(canvas),
            RenderMode::Concurrent => PaintTarget::Thread(RenderThread::spawn(scene.clone(), canvas)?),
        };
        Ok(Self::with_target(model, config, scene, target))
    }

    /// Animator without a visible canvas, painting inline. Useful for
    /// recording-only runs and tests.
    pub fn headless(model: Arc<SurfaceModel>, config: AnimatorConfig) -> Self {
        let config = config.sanitized();
        let scene = SceneHandle::new(config.icon_size);
        Self::with_target(model, config, scene, PaintTarget::Inline(Box::new(NullCanvas)))
    }

    fn with_target(model: Arc<SurfaceModel>, config: AnimatorConfig, scene: SceneHandle, target: PaintTarget) -> Self {
        let pacer = FramePacer::new(target, config.min_frame_interval());
        Self {
            router: WayPointRouter::new(&model),
            routes: RouteCache::new(config.icon_size),
            statics: StaticIconBuilder::new(config.icon_size, config.stack_limit, config.default_box()),
            scene,
            pacer,
            breakpoints: BreakpointSet::new(),
            display_elements: Vec::new(),
            interrupt: InterruptHandle::new(),
            clients: Vec::new(),
            operators: Vec::new(),
            transporters: Vec::new(),
            variables: None,
            first_update_step: true,
            no_additional_frames: false,
            slow_mode: config.slow_mode,
            full_recording: false,
            pending_moves: Vec::new(),
            last_multi_move_time: None,
            model,
            config,
        }
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<SurfaceModel> {
        &self.model
    }

    /// Handle to the shared scene, e.g. for a custom render loop.
    pub fn scene(&self) -> SceneHandle {
        self.scene.clone()
    }

    pub fn route_cache(&self) -> &RouteCache {
        &self.routes
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Prepare for a new run: drop cached routes, icon lists, entity
    /// snapshots and recorded data. Breakpoints and display elements stay.
    pub fn reset(&mut self) {
        self.routes.clear();
        self.statics.clear();
        self.scene.reset();
        self.clients.clear();
        self.operators.clear();
        self.transporters.clear();
        self.variables = None;
        self.first_update_step = true;
        self.no_additional_frames = false;
        self.pending_moves.clear();
        self.last_multi_move_time = None;
        self.interrupt.clear();
        debug!(anchors = self.model.len(), "animator reset");
    }

    /// Switch to another model and reset.
    pub fn replace_model(&mut self, model: Arc<SurfaceModel>) {
        self.router = WayPointRouter::new(&model);
        self.model = model;
        self.reset();
    }

    pub fn add_display_element(&mut self, element: Box<dyn DisplayElement>) {
        self.display_elements.push(element);
    }

    pub fn is_slow_mode(&self) -> bool {
        self.slow_mode
    }

    pub fn set_slow_mode(&mut self, slow_mode: bool) {
        self.slow_mode = slow_mode;
    }

    /// Handle another thread can use to cut pacing short.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn clear_interrupt(&self) {
        self.interrupt.clear();
    }

    // -----------------------------------------------------------------------
    // Per-step entry points
    // -----------------------------------------------------------------------

    /// Refresh the entity snapshots and push simulation values into the
    /// display elements. Call once per simulation step before animating.
    pub fn pre_process(&mut self, sim: &dyn SimulationData) {
        self.clients = sim.clients_in_use();
        if self.config.animate_resources {
            self.operators = sim.operators();
            self.transporters = sim.transporters();
        }
        self.update_surface_animation_display_elements(sim, true, false);
    }

    /// Update display elements; paint if any changed and `suppress_paint`
    /// is not set.
    pub fn update_surface_animation_display_elements(
        &mut self,
        sim: &dyn SimulationData,
        is_preview: bool,
        suppress_paint: bool,
    ) {
        if self.first_update_step {
            if self.config.animate_resources && self.operators.is_empty() && self.transporters.is_empty() {
                self.operators = sim.operators();
                self.transporters = sim.transporters();
            }
            for element in &mut self.display_elements {
                element.init_animation(sim);
            }
            self.pacer.reset_clock();
            self.first_update_step = false;
        }

        let mut need_paint = false;
        for element in &mut self.display_elements {
            if element.update_simulation_data(sim, is_preview) {
                need_paint = true;
            }
        }
        if need_paint {
            self.no_additional_frames = true;
            if !suppress_paint {
                self.paint_surface(sim);
            }
        }
    }

    /// Whether a video recorder should repeat frames to cover simulated
    /// time without visible change. Off once any display element changed.
    pub fn use_additional_frames(&self) -> bool {
        !self.no_additional_frames
    }

    /// Report a client movement (or, with `None`, a state change without
    /// movement) and animate according to the configured move mode.
    pub fn process_client(&mut self, sim: &dyn SimulationData, client: Option<&ClientRef>, delay: u32) {
        self.pre_process(sim);

        if let Some(c) = client {
            let kind = |id: Option<StationId>| id.and_then(|id| self.model.anchor(id)).map(|a| &a.kind);
            if matches!(kind(c.last_station), Some(StationKind::TransportSource))
                && matches!(kind(c.next_station), Some(StationKind::TransportDestination))
            {
                // Carried by a transporter, not along a connection.
                return;
            }
        }

        match self.config.move_mode {
            MoveMode::Single => {
                if let Some(mv) = client.and_then(MoveClient::new) {
                    self.animate_client(&mv, delay, sim);
                }
            }
            MoveMode::Multi => self.process_multi(sim, client, delay),
        }
    }

    fn process_multi(&mut self, sim: &dyn SimulationData, client: Option<&ClientRef>, delay: u32) {
        let mut mv = client.and_then(MoveClient::new);
        let force_move = mv.as_ref().is_some_and(|m| {
            self.model
                .anchor(m.to)
                .is_some_and(|a| a.kind == StationKind::ForceMove)
        });

        let already_pending = mv
            .as_ref()
            .is_some_and(|m| self.pending_moves.iter().any(|p| p.client.key == m.client.key));
        if already_pending {
            let batch = std::mem::take(&mut self.pending_moves);
            self.animate_clients(&batch, delay, sim, false);
        }

        let now = sim.current_time();
        if mv.is_none() || self.last_multi_move_time != Some(now) || force_move {
            if let Some(m) = mv.take() {
                self.pending_moves.push(m);
            }
            let batch = std::mem::take(&mut self.pending_moves);
            self.animate_clients(&batch, delay, sim, true);
            self.last_multi_move_time = Some(now);
        }

        if let Some(m) = mv {
            self.pending_moves.push(m);
        }
    }

    /// Report a transporter movement. Transporters that did not change
    /// position are ignored.
    pub fn process_transporter(&mut self, sim: &dyn SimulationData, transporter: &TransporterRef, delay: u32) {
        self.pre_process(sim);
        let (Some(from), Some(to)) = (transporter.last_position, transporter.position) else {
            return;
        };
        if from == to {
            return;
        }
        let (east, west) = transporter.icons.pair(transporter.loaded);
        self.animate_transporter(east, west, transporter, delay, sim);
    }

    // -----------------------------------------------------------------------
    // Animation
    // -----------------------------------------------------------------------

    /// Animate a single client movement.
    pub fn animate_client(&mut self, mv: &MoveClient, delay: u32, sim: &dyn SimulationData) {
        self.animate_clients(std::slice::from_ref(mv), delay, sim, true);
    }

    /// Animate several client movements simultaneously. Display elements
    /// are refreshed afterwards only if `last_step` is set.
    pub fn animate_clients(&mut self, moves: &[MoveClient], delay: u32, sim: &dyn SimulationData, last_step: bool) {
        self.scene.begin_animation();
        for mv in moves {
            self.adopt_client(&mv.client);
        }

        let excluded: Exclusions = moves
            .iter()
            .map(|m| (EntityKind::Client, m.client.key))
            .collect();
        self.rebuild_static(&excluded, sim.current_time());

        let paths: Vec<AnimationPath> = moves.iter().filter_map(|m| self.client_path(m)).collect();
        let delay = if self.full_recording { 1 } else { delay };
        self.animate_path_list(&paths, delay, sim);

        self.rebuild_static(&Exclusions::new(), sim.current_time());
        if last_step {
            self.update_surface_animation_display_elements(sim, false, false);
        }
        self.paint_surface(sim);
        self.scene.finish_animation();
    }

    /// Animate a transporter trip using the given direction icons.
    pub fn animate_transporter(
        &mut self,
        icon_east: &str,
        icon_west: &str,
        transporter: &TransporterRef,
        delay: u32,
        sim: &dyn SimulationData,
    ) {
        self.scene.begin_animation();
        self.adopt_transporter(transporter);

        let excluded: Exclusions = HashSet::from([(EntityKind::Transporter, transporter.key)]);
        self.rebuild_static(&excluded, sim.current_time());

        let paths: Vec<AnimationPath> = self
            .transporter_path(transporter, icon_east, icon_west)
            .into_iter()
            .collect();
        let delay = if self.full_recording { 1 } else { delay };
        self.animate_path_list(&paths, delay, sim);

        self.rebuild_static(&Exclusions::new(), sim.current_time());
        self.update_surface_animation_display_elements(sim, false, false);
        self.paint_surface(sim);
        self.scene.finish_animation();
    }

    /// Make sure the static rebuild after a movement sees the mover's
    /// reported state even if the snapshot predates it.
    fn adopt_client(&mut self, client: &ClientRef) {
        match self.clients.iter_mut().find(|c| c.key == client.key) {
            Some(existing) => *existing = client.clone(),
            None => self.clients.push(client.clone()),
        }
    }

    fn adopt_transporter(&mut self, transporter: &TransporterRef) {
        if !self.config.animate_resources {
            return;
        }
        match self.transporters.iter_mut().find(|t| t.key == transporter.key) {
            Some(existing) => *existing = transporter.clone(),
            None => self.transporters.push(transporter.clone()),
        }
    }

    fn rebuild_static(&mut self, excluded: &Exclusions, now: u64) {
        let entities = ActiveEntities {
            clients: &self.clients,
            operators: &self.operators,
            transporters: &self.transporters,
        };
        let icons = self.statics.rebuild(&self.model, entities, excluded, now);
        self.scene.publish_static(icons);
    }

    fn animate_path_list(&mut self, paths: &[AnimationPath], delay: u32, sim: &dyn SimulationData) {
        let points = paths.iter().map(AnimationPath::len).max().unwrap_or(0);
        if points == 0 {
            return;
        }

        let mut integrator = DelayIntegrator::new(self.config.sleep_granule());
        let mut pacing = true;
        for index in 0..points - 1 {
            let frame: Vec<DrawIcon> = paths.iter().filter_map(|p| p.draw_icon(index)).collect();
            self.scene.publish_moving(frame);
            self.paint_surface(sim);

            if pacing && !integrator.settle(&self.interrupt) {
                debug!(step = index, "pacing interrupted");
                pacing = false;
            }
            integrator.add(delay);
        }
        self.scene.clear_moving();
    }

    /// Path of a client movement, or `None` if it is not drawn.
    ///
    /// Stations inside a sub-model are drawn at the sub-model box; a move
    /// that stays within one box has no visible path.
    fn client_path(&mut self, mv: &MoveClient) -> Option<AnimationPath> {
        let from = self.model.main_box(self.model.station_at_main_level(mv.from))?.id;
        let to = self.model.main_box(self.model.station_at_main_level(mv.to))?.id;
        if from == to {
            return None;
        }
        let chain = self.router.route_for(&self.model, EntityKind::Client, from, to)?;
        if chain.len() == 2 && self.model.outgoing(from).all(|c| c.to != to) {
            debug!(%from, %to, "no connection chain, direct client path");
        }

        let icon = mv.client.moving_icon();
        let mut path = AnimationPath::new(
            EntityTag::from(&mv.client),
            mv.client.last_station,
            mv.client.next_station,
            icon,
            icon,
        );
        self.fill_path(&mut path, &chain, self.config.client_base_steps);
        Some(path)
    }

    fn transporter_path(&mut self, transporter: &TransporterRef, icon_east: &str, icon_west: &str) -> Option<AnimationPath> {
        let from = self.model.main_box(transporter.last_position?)?.id;
        let to = self.model.main_box(transporter.position?)?.id;

        let mut path = AnimationPath::new(
            EntityTag::from(transporter),
            Some(from),
            Some(to),
            icon_east,
            icon_west,
        );
        let chain = self.router.transporter_chain(from, to);
        self.fill_path(&mut path, &chain, self.config.transporter_base_steps);
        Some(path)
    }

    /// Append the routes along `chain` to `path`. A two-anchor chain gets
    /// the full base step count; longer chains share it between legs.
    fn fill_path(&mut self, path: &mut AnimationPath, chain: &[StationId], base_steps: u32) {
        let per_leg = if chain.len() < 3 {
            base_steps
        } else {
            partial_steps(base_steps, chain.len())
        };
        for leg in chain.windows(2) {
            let (Some(a), Some(b)) = (self.model.anchor(leg[0]), self.model.anchor(leg[1])) else {
                continue;
            };
            let distance = a.bounds.middle().distance(b.bounds.middle());
            let steps = steps_for_distance(per_leg, self.config.reference_distance, distance);
            if let Some(route) = self.routes.build_route(&self.model, leg[0], leg[1], steps) {
                path.extend_route(&route);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Painting and diagnostics
    // -----------------------------------------------------------------------

    fn paint_surface(&mut self, sim: &dyn SimulationData) {
        self.variables = Some(sim.variables());
        self.pacer
            .request_frame(&self.scene, self.slow_mode, self.full_recording);
    }

    /// Average frames per second since the run started.
    pub fn fps(&self) -> u64 {
        self.pacer.fps()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.pacer.stats()
    }

    pub fn static_icons(&self) -> Vec<Arc<DrawIcon>> {
        self.scene.static_icons()
    }

    pub fn moving_icons(&self) -> Vec<DrawIcon> {
        self.scene.moving_icons()
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    pub fn set_full_recording(&mut self, enabled: bool) {
        self.full_recording = enabled;
        self.scene.set_full_recording(enabled);
    }

    pub fn is_full_recording(&self) -> bool {
        self.full_recording
    }

    /// Drain what was recorded for simulation time `time`.
    pub fn animation_step_info(&self, time: u64, client_types: &[String]) -> StepInfo {
        self.scene.step_info(time, client_types)
    }

    // -----------------------------------------------------------------------
    // Breakpoints
    // -----------------------------------------------------------------------

    pub fn break_points(&self) -> Vec<Breakpoint> {
        self.breakpoints.get_all()
    }

    pub fn set_break_points(&self, breakpoints: &[Breakpoint]) {
        self.breakpoints.set_all(breakpoints);
    }

    /// Install or, with `None`, remove the breakpoint at `station`.
    pub fn set_break_point(&self, station: StationId, breakpoint: Option<Breakpoint>) {
        self.breakpoints.set_for_station(station, breakpoint);
    }

    pub fn test_break_points(&self, sim: &dyn SimulationData, entity: &Entity) -> bool {
        self.breakpoints.test(sim, entity)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Evaluate `text` against the variables of the last painted frame.
    pub fn calculate_expression(&self, text: &str) -> Option<f64> {
        let variables = self.variables.as_ref()?;
        Expression::parse(text).ok()?.evaluate(variables).ok()
    }

    /// Hand `script` and the last variable snapshot to `hook`.
    pub fn run_script(&self, hook: &dyn ScriptHook, script: &str) -> String {
        match &self.variables {
            Some(variables) => hook.run(script, variables),
            None => NO_SIMULATION_DATA.to_string(),
        }
    }

    /// Keys of the clients waiting in the multi-move batch.
    pub fn pending_moves(&self) -> Vec<EntityKey> {
        self.pending_moves.iter().map(|m| m.client.key).collect()
    }
}

impl std::fmt::Debug for Animator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animator")
            .field("config", &self.config)
            .field("anchors", &self.model.len())
            .field("cached_routes", &self.routes.len())
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}
