//! Screen-coordinate routes between two anchors, and their cache.
//!
//! A route for `steps` steps has `steps + 1` points: the exact midpoints of
//! both anchors at either end and `steps - 1` sampled points in between.
//! Intermediate points are shifted by half an icon so the icon sits centred
//! on the connection line.

use std::collections::HashMap;
use std::sync::Arc;

use crate::geometry::{Bounds, Point};
use crate::id::StationId;
use crate::model::{LineMode, SurfaceModel};

/// Cache key: routes depend only on the two anchors and the step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub from: StationId,
    pub to: StationId,
    pub steps: u32,
}

/// Memoizes routes per `(from, to, steps)`.
///
/// Cached routes are immutable and shared, so a cached entry is returned
/// as-is on every later lookup. The cache is owned by the animator and
/// cleared whenever the model changes.
#[derive(Debug)]
pub struct RouteCache {
    icon_size: i32,
    routes: HashMap<RouteKey, Arc<[Point]>>,
    hits: u64,
    misses: u64,
}

impl RouteCache {
    pub fn new(icon_size: i32) -> Self {
        Self {
            icon_size,
            routes: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Route from `from` to `to` in `steps` steps (at least one).
    ///
    /// Returns `None` if either anchor is unknown to `model`.
    pub fn build_route(
        &mut self,
        model: &SurfaceModel,
        from: StationId,
        to: StationId,
        steps: u32,
    ) -> Option<Arc<[Point]>> {
        let key = RouteKey {
            from,
            to,
            steps: steps.max(1),
        };
        if let Some(route) = self.routes.get(&key) {
            self.hits += 1;
            return Some(Arc::clone(route));
        }

        let source = model.anchor(from)?;
        let destination = model.anchor(to)?;
        let mode = model.line_mode(from, to);
        let route: Arc<[Point]> =
            calc_route(&source.bounds, &destination.bounds, mode, key.steps, self.icon_size).into();
        self.misses += 1;
        self.routes.insert(key, Arc::clone(&route));
        Some(route)
    }

    pub fn get(&self, key: &RouteKey) -> Option<Arc<[Point]>> {
        self.routes.get(key).cloned()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Sample a route between two boxes.
///
/// `Direct` and `Curved` interpolate linearly. Both orthogonal styles walk
/// three axis-aligned legs through the midpoint between the anchors; which
/// axis comes first depends on the side the connection leaves `source`.
pub fn calc_route(
    source: &Bounds,
    destination: &Bounds,
    mode: LineMode,
    steps: u32,
    icon_size: i32,
) -> Vec<Point> {
    let steps = i64::from(steps.max(1));
    let p1 = source.middle();
    let p2 = destination.middle();
    let half_icon = i64::from(icon_size / 2);

    let (x1, y1) = (i64::from(p1.x), i64::from(p1.y));
    let (x2, y2) = (i64::from(p2.x), i64::from(p2.y));

    let mut route = Vec::with_capacity(steps as usize + 1);
    route.push(p1);

    match mode {
        LineMode::Direct | LineMode::Curved => {
            let (dx, dy) = (x2 - x1, y2 - y1);
            for i in 1..steps {
                route.push(point(x1 + i * dx / steps, y1 + i * dy / steps - half_icon));
            }
        }
        LineMode::Orthogonal | LineMode::OrthogonalRounded => {
            let exit = source.connection_point_towards(p2);
            let horizontal_first = exit.x != p1.x;
            let legs = if horizontal_first {
                ThreeLegs::new((x1, y1), (x2, y2))
            } else {
                // Same walk with the axes swapped.
                ThreeLegs::new((y1, x1), (y2, x2))
            };
            for i in 1..steps {
                let pos = i * legs.total / steps;
                let (a, b) = legs.sample(pos, half_icon);
                route.push(if horizontal_first { point(a, b) } else { point(b, a) });
            }
        }
    }

    route.push(p2);
    route
}

fn point(x: i64, y: i64) -> Point {
    Point::new(x as i32, y as i32)
}

/// Three-leg walk along a primary axis `a` and a secondary axis `b`:
/// out along `a` to the middle, across along `b`, then in along `a`.
struct ThreeLegs {
    start: (i64, i64),
    end: (i64, i64),
    middle: i64,
    signs: (i64, i64, i64),
    /// Cumulative leg lengths.
    first: i64,
    second: i64,
    total: i64,
}

impl ThreeLegs {
    fn new(start: (i64, i64), end: (i64, i64)) -> Self {
        let middle = (start.0 + end.0) / 2;
        let d1 = middle - start.0;
        let d2 = end.1 - start.1;
        let d3 = end.0 - middle;
        let first = d1.abs();
        let second = first + d2.abs();
        Self {
            start,
            end,
            middle,
            signs: (d1.signum(), d2.signum(), d3.signum()),
            first,
            second,
            total: second + d3.abs(),
        }
    }

    /// Position `pos` along the walk, as `(a, b)`. The icon offset applies
    /// to the secondary coordinate on the outer legs and to the primary one
    /// on the middle leg.
    fn sample(&self, pos: i64, half_icon: i64) -> (i64, i64) {
        if pos < self.first {
            (self.start.0 + pos * self.signs.0, self.start.1 - half_icon)
        } else if pos < self.second {
            (self.middle - half_icon, self.start.1 + (pos - self.first) * self.signs.1)
        } else {
            (self.middle + (pos - self.second) * self.signs.2, self.end.1 - half_icon)
        }
    }
}
