//! Serde data file structs for scene descriptions.
//!
//! These structs define the on-disk format of a model surface: stations,
//! connections and way points. They are deserialized from RON, JSON, or
//! TOML files and then resolved into a [`SurfaceModel`] by the loader.
//!
//! [`SurfaceModel`]: animflow_core::model::SurfaceModel

use animflow_core::model::{LineMode, StationKind};
use serde::Deserialize;

// ===========================================================================
// Stations
// ===========================================================================

/// A station, vertex or way point in a scene file.
///
/// `width` and `height` may be omitted for boxes; the animator then uses its
/// configured default box size. `parent` places the element on the inner
/// surface of that sub-model.
#[derive(Debug, Clone, Deserialize)]
pub struct StationData {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: StationKind,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub parent: Option<u32>,
}

fn default_kind() -> StationKind {
    StationKind::Box
}

// ===========================================================================
// Connections
// ===========================================================================

/// A directed connection between two element ids. Without `line_mode` the
/// scene's default style applies.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionData {
    pub from: u32,
    pub to: u32,
    #[serde(default)]
    pub line_mode: Option<LineMode>,
}

// ===========================================================================
// Scene
// ===========================================================================

/// A complete scene file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub default_line_mode: LineMode,
    #[serde(default)]
    pub stations: Vec<StationData>,
    #[serde(default)]
    pub connections: Vec<ConnectionData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use animflow_core::model::WayPointRecord;

    #[test]
    fn station_defaults() {
        let s: StationData = serde_json::from_str(r#"{"id": 1, "x": 10, "y": 20}"#).unwrap();
        assert_eq!(s.kind, StationKind::Box);
        assert_eq!((s.width, s.height), (0, 0));
        assert!(s.name.is_empty());
        assert_eq!(s.parent, None);
    }

    #[test]
    fn way_point_kind_in_json() {
        let s: StationData = serde_json::from_str(
            r#"{"id": 9, "x": 0, "y": 0,
                "kind": {"way_point": {"records": [{"station_a": "*", "station_b": "Dock", "index": 2}]}}}"#,
        )
        .unwrap();
        assert_eq!(
            s.kind,
            StationKind::WayPoint {
                records: vec![WayPointRecord::new("*", "Dock", 2)]
            }
        );
    }

    #[test]
    fn conveyor_kind_in_toml() {
        let s: StationData = toml::from_str(
            r#"
id = 4
x = 0
y = 0
kind = { conveyor = { transfer_time = 2.5, time_base = "minutes", direction = "right_to_left" } }
"#,
        )
        .unwrap();
        let StationKind::Conveyor(spec) = s.kind else {
            panic!("expected conveyor, got {:?}", s.kind);
        };
        assert_eq!(spec.transfer_millis(), 150_000.0);
    }

    #[test]
    fn scene_sections_are_optional() {
        let scene: SceneFile = serde_json::from_str("{}").unwrap();
        assert!(scene.stations.is_empty());
        assert!(scene.connections.is_empty());
        assert_eq!(scene.default_line_mode, LineMode::Direct);
    }

    #[test]
    fn connection_line_mode() {
        let c: ConnectionData =
            serde_json::from_str(r#"{"from": 1, "to": 2, "line_mode": "orthogonal_rounded"}"#).unwrap();
        assert_eq!(c.line_mode, Some(LineMode::OrthogonalRounded));
    }
}
