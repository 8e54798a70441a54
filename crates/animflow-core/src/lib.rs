//! Animflow Core -- animation synchronization for discrete-event simulations.
//!
//! This crate keeps a drawable scene in step with a running simulation:
//! entities resting at stations, entities moving along connections, frame
//! pacing against a render thread, breakpoints, and a full recording of
//! what was shown for later replay.
//!
//! # Movement Pipeline
//!
//! Each reported movement passes through [`engine::Animator`] in four
//! phases:
//!
//! 1. **Static rebuild** -- Non-moving entities are laid out at their stations.
//! 2. **Paths** -- Mover routes are resolved through vertices or way points
//!    and sampled into screen points via the route cache.
//! 3. **Steps** -- The moving list is replaced per step and a frame requested;
//!    the delay integrator paces the loop.
//! 4. **Settle** -- Movers join the static list at their destination and
//!    display elements refresh.
//!
//! # Threading
//!
//! The simulation thread owns the [`engine::Animator`]. The render thread
//! only sees the [`scene::SceneHandle`], whose lists are replaced wholesale
//! under one lock:
//!
//! ```rust,ignore
//! let mut animator = Animator::new(model, config, Box::new(canvas))?;
//! animator.process_client(&sim, Some(&client), 100);
//! let statics = animator.static_icons();
//! ```
//!
//! # Key Types
//!
//! - [`engine::Animator`] -- Drives movements and owns the pacing.
//! - [`model::SurfaceModel`] -- Stations, vertices, way points and connections.
//! - [`route::RouteCache`] -- Memoized point routes per `(from, to, steps)`.
//! - [`waypoint::WayPointRouter`] -- Anchor chains for clients and transporters.
//! - [`icons::StaticIconBuilder`] -- Resting positions with stacking.
//! - [`pacer::FramePacer`] -- Throttles and dispatches frames.
//! - [`breakpoint::BreakpointSet`] -- Station/type/condition breakpoints.
//! - [`recording`] -- Full-recording accumulation and export via bitcode.

pub mod breakpoint;
pub mod config;
pub mod display;
pub mod engine;
pub mod entity;
pub mod expr;
pub mod geometry;
pub mod icons;
pub mod id;
pub mod model;
pub mod pacer;
pub mod path;
pub mod recording;
pub mod render;
pub mod route;
pub mod scene;
pub mod sim;
pub mod waypoint;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
