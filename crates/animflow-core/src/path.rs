//! Animation paths: the concatenated route points one entity follows during
//! a movement, plus the step arithmetic that sizes each leg.

use std::sync::Arc;

use crate::entity::EntityTag;
use crate::geometry::Point;
use crate::icons::DrawIcon;
use crate::id::StationId;

/// Step count for a leg of `distance` pixels, proportional to
/// `base_steps` per `reference_distance` pixels.
pub fn steps_for_distance(base_steps: u32, reference_distance: u32, distance: u32) -> u32 {
    let steps = u64::from(base_steps) * u64::from(distance) / u64::from(reference_distance.max(1));
    u32::try_from(steps).unwrap_or(u32::MAX)
}

/// Per-leg base steps for a path through `anchors` anchors.
///
/// Spreads `base_steps` over the legs, with at least two steps per leg.
/// Paths with many short legs fall back to the full base per leg so each
/// leg stays visible, and the total is capped at three times the base.
pub fn partial_steps(base_steps: u32, anchors: usize) -> u32 {
    let anchors = u32::try_from(anchors.max(2)).unwrap_or(u32::MAX);
    let legs = anchors - 1;
    let mut partial = (base_steps.saturating_sub(1) / legs).max(2);
    if partial < base_steps / 4 {
        partial = base_steps;
    }
    if u64::from(partial) * u64::from(anchors) > u64::from(base_steps) * 3 {
        partial = base_steps * 3 / anchors;
    }
    partial
}

/// Ordered screen positions of one entity's movement.
#[derive(Debug, Clone)]
pub struct AnimationPath {
    entity: EntityTag,
    source: Option<StationId>,
    destination: Option<StationId>,
    icon_east: Arc<str>,
    icon_west: Arc<str>,
    points: Vec<Point>,
}

impl AnimationPath {
    pub fn new(
        entity: EntityTag,
        source: Option<StationId>,
        destination: Option<StationId>,
        icon_east: &str,
        icon_west: &str,
    ) -> Self {
        Self {
            entity,
            source,
            destination,
            icon_east: Arc::from(icon_east),
            icon_west: Arc::from(icon_west),
            points: Vec::new(),
        }
    }

    pub fn entity(&self) -> &EntityTag {
        &self.entity
    }

    /// Append a point unless it repeats the last one.
    pub fn push_point(&mut self, point: Point) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    pub fn extend_route(&mut self, route: &[Point]) {
        for &p in route {
            self.push_point(p);
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Icon for step `index`, clamped to the last point. The westbound icon
    /// is used when the step moves left.
    pub fn draw_icon(&self, index: usize) -> Option<DrawIcon> {
        let last = self.points.len().checked_sub(1)?;
        let index = index.min(last);
        let point = self.points[index];
        let westward = index > 0 && self.points[index - 1].x > point.x;
        let icon = if westward {
            &self.icon_west
        } else {
            &self.icon_east
        };
        Some(DrawIcon {
            x: point.x,
            y: point.y,
            icon: Arc::clone(icon),
            source: self.source,
            destination: self.destination,
            entity: self.entity.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ClientRef;

    fn path() -> AnimationPath {
        AnimationPath::new(
            EntityTag::from(&ClientRef::new(1)),
            Some(StationId(1)),
            Some(StationId(2)),
            "lorry",
            "lorry-left",
        )
    }

    #[test]
    fn steps_scale_with_distance() {
        assert_eq!(steps_for_distance(25, 250, 250), 25);
        assert_eq!(steps_for_distance(25, 250, 500), 50);
        assert_eq!(steps_for_distance(25, 250, 5), 0);
        assert_eq!(steps_for_distance(50, 250, 125), 25);
    }

    #[test]
    fn partial_steps_spread_over_legs() {
        // Three anchors, two legs: 24 / 2 = 12.
        assert_eq!(partial_steps(25, 3), 12);
        // Many legs: spread falls below a quarter of the base, use full base,
        // then the cap of three bases kicks in: 75 / 20.
        assert_eq!(partial_steps(25, 20), 3);
        // Never fewer than two steps per leg before capping.
        assert_eq!(partial_steps(25, 10), 7);
        assert_eq!(partial_steps(50, 3), 24);
    }

    #[test]
    fn consecutive_duplicates_are_dropped() {
        let mut p = path();
        p.extend_route(&[Point::new(0, 0), Point::new(10, 0)]);
        p.extend_route(&[Point::new(10, 0), Point::new(20, 0)]);
        assert_eq!(p.len(), 3);
        p.push_point(Point::new(0, 0));
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn draw_icon_clamps_and_picks_direction() {
        let mut p = path();
        p.extend_route(&[Point::new(0, 0), Point::new(10, 0), Point::new(5, 0)]);
        assert_eq!(&*p.draw_icon(0).unwrap().icon, "lorry");
        assert_eq!(&*p.draw_icon(1).unwrap().icon, "lorry");
        assert_eq!(&*p.draw_icon(2).unwrap().icon, "lorry-left");
        let clamped = p.draw_icon(99).unwrap();
        assert_eq!(clamped.position(), Point::new(5, 0));
        assert_eq!(clamped.source, Some(StationId(1)));
    }

    #[test]
    fn empty_path_draws_nothing() {
        assert!(path().draw_icon(0).is_none());
    }
}
