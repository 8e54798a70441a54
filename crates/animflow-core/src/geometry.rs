//! Integer screen geometry shared by the path builder and icon layout.
//!
//! All coordinates are unzoomed surface pixels. Zooming is the canvas'
//! business.

use serde::{Deserialize, Serialize};

/// A point on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance, truncated to whole pixels.
    pub fn distance(self, other: Point) -> u32 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt() as u32
    }
}

/// Width and height of an anchor box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Replace non-positive dimensions with the given fallback.
    pub fn or_default(self, fallback: Size) -> Size {
        Size {
            width: if self.width > 0 { self.width } else { fallback.width },
            height: if self.height > 0 { self.height } else { fallback.height },
        }
    }
}

/// Axis-aligned box of an anchor: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub origin: Point,
    pub size: Size,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Centre of the box.
    pub fn middle(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2,
            self.origin.y + self.size.height / 2,
        )
    }

    /// The point on the box border where a connection towards `target`
    /// leaves the box.
    ///
    /// The box is split into four triangular sectors by its diagonals through
    /// the centre; the side facing `target` is chosen and its midpoint (one
    /// pixel outside the border) returned. Only the side matters to the
    /// orthogonal router: an x-coordinate different from the centre means
    /// the connection leaves horizontally.
    pub fn connection_point_towards(&self, target: Point) -> Point {
        let x_start = self.origin.x - 1;
        let y_start = self.origin.y - 1;
        let x_end = self.origin.x + self.size.width + 1;
        let y_end = self.origin.y + self.size.height + 1;
        let Point {
            x: x_middle,
            y: y_middle,
        } = self.middle();

        if y_middle > target.y {
            // Target lies above the box.
            if target.x - x_middle < target.y - y_middle {
                return Point::new(x_start, y_middle);
            }
            if target.x - x_middle > y_middle - target.y {
                return Point::new(x_end, y_middle);
            }
            Point::new(x_middle, y_start)
        } else {
            // Target lies below (or level with) the box.
            if target.x - x_middle > target.y - y_middle {
                return Point::new(x_end, y_middle);
            }
            if target.x - x_middle < y_middle - target.y {
                return Point::new(x_start, y_middle);
            }
            Point::new(x_middle, y_end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_truncated() {
        assert_eq!(Point::new(0, 0).distance(Point::new(3, 4)), 5);
        assert_eq!(Point::new(0, 0).distance(Point::new(1, 1)), 1);
        assert_eq!(Point::new(10, 10).distance(Point::new(10, 10)), 0);
    }

    #[test]
    fn size_fallback_only_replaces_missing_dimensions() {
        let fallback = Size::new(100, 50);
        assert_eq!(Size::new(0, 30).or_default(fallback), Size::new(100, 30));
        assert_eq!(Size::new(80, -1).or_default(fallback), Size::new(80, 50));
        assert_eq!(Size::new(80, 40).or_default(fallback), Size::new(80, 40));
    }

    #[test]
    fn middle_of_box() {
        let b = Bounds::new(100, 200, 100, 50);
        assert_eq!(b.middle(), Point::new(150, 225));
    }

    #[test]
    fn connection_leaves_right_side_for_target_to_the_east() {
        let b = Bounds::new(0, 0, 100, 50);
        let p = b.connection_point_towards(Point::new(500, 25));
        assert_eq!(p, Point::new(101, 25));
    }

    #[test]
    fn connection_leaves_left_side_for_target_to_the_west() {
        let b = Bounds::new(400, 0, 100, 50);
        let p = b.connection_point_towards(Point::new(0, 25));
        assert_eq!(p, Point::new(399, 25));
    }

    #[test]
    fn connection_leaves_bottom_for_target_straight_below() {
        let b = Bounds::new(0, 0, 100, 50);
        let p = b.connection_point_towards(Point::new(50, 400));
        assert_eq!(p, Point::new(50, 51));
    }

    #[test]
    fn connection_leaves_top_for_target_straight_above() {
        let b = Bounds::new(0, 400, 100, 50);
        let p = b.connection_point_towards(Point::new(50, 0));
        assert_eq!(p, Point::new(50, 399));
    }
}
