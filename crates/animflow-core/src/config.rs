//! Animator configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. `animflow-data` loads this struct from RON, TOML or JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::Size;

/// How frames reach the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Paint inline on the simulation thread.
    #[default]
    Synchronous,
    /// Hand frames to a dedicated render thread; drop frames while it is busy.
    Concurrent,
}

/// How client moves at the same simulation instant are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveMode {
    /// Animate each move as it is reported.
    #[default]
    Single,
    /// Collect moves and animate all moves of one instant together.
    Multi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    pub render_mode: RenderMode,
    /// Start in slow mode: every frame is painted and waited for.
    pub slow_mode: bool,
    /// Also draw operators and transporters.
    pub animate_resources: bool,
    pub move_mode: MoveMode,
    pub min_frame_interval_ms: u64,
    pub icon_size: i32,
    /// Path steps for a client move over `reference_distance` pixels.
    pub client_base_steps: u32,
    /// Path steps for a transporter move over `reference_distance` pixels.
    pub transporter_base_steps: u32,
    pub reference_distance: u32,
    /// Icons per row before a station's fan wraps into another row.
    pub stack_limit: u32,
    pub sleep_granule_ms: u64,
    pub default_box_width: i32,
    pub default_box_height: i32,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Synchronous,
            slow_mode: false,
            animate_resources: true,
            move_mode: MoveMode::Single,
            min_frame_interval_ms: 15,
            icon_size: 25,
            client_base_steps: 25,
            transporter_base_steps: 50,
            reference_distance: 250,
            stack_limit: 8,
            sleep_granule_ms: 5,
            default_box_width: 100,
            default_box_height: 50,
        }
    }
}

impl AnimatorConfig {
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_millis(self.min_frame_interval_ms)
    }

    pub fn sleep_granule(&self) -> Duration {
        Duration::from_millis(self.sleep_granule_ms)
    }

    pub fn default_box(&self) -> Size {
        Size::new(self.default_box_width, self.default_box_height)
    }

    /// Clamp values that would break layout or pacing arithmetic.
    pub fn sanitized(mut self) -> Self {
        self.icon_size = self.icon_size.max(1);
        self.client_base_steps = self.client_base_steps.max(1);
        self.transporter_base_steps = self.transporter_base_steps.max(1);
        self.reference_distance = self.reference_distance.max(1);
        self.stack_limit = self.stack_limit.max(1);
        self.sleep_granule_ms = self.sleep_granule_ms.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AnimatorConfig::default();
        assert_eq!(c.render_mode, RenderMode::Synchronous);
        assert_eq!(c.min_frame_interval(), Duration::from_millis(15));
        assert_eq!(c.icon_size, 25);
        assert_eq!(c.default_box(), Size::new(100, 50));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: AnimatorConfig =
            serde_json::from_str(r#"{"render_mode": "concurrent", "icon_size": 32}"#).unwrap();
        assert_eq!(c.render_mode, RenderMode::Concurrent);
        assert_eq!(c.icon_size, 32);
        assert_eq!(c.client_base_steps, 25);
        assert_eq!(c.move_mode, MoveMode::Single);
    }

    #[test]
    fn sanitized_clamps_zeroes() {
        let c = AnimatorConfig {
            stack_limit: 0,
            reference_distance: 0,
            sleep_granule_ms: 0,
            ..AnimatorConfig::default()
        }
        .sanitized();
        assert_eq!(c.stack_limit, 1);
        assert_eq!(c.reference_distance, 1);
        assert_eq!(c.sleep_granule_ms, 1);
    }
}
