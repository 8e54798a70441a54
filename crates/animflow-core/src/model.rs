//! The read-only view of the editor's model graph the animator works on.
//!
//! A [`SurfaceModel`] holds every anchor (station box, vertex, way point)
//! of the main surface and of all sub-model surfaces, plus the directed
//! connections between them. It is built once per model instance and shared
//! behind an `Arc`; the animator never mutates it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;
use crate::id::{StationId, SurfaceId};

/// Unit of a conveyor's transfer time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBase {
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl TimeBase {
    /// Convert a duration in this unit to simulation milliseconds.
    pub fn to_millis(self, value: f64) -> f64 {
        match self {
            TimeBase::Seconds => value * 1_000.0,
            TimeBase::Minutes => value * 60_000.0,
            TimeBase::Hours => value * 3_600_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConveyorDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Parameters of a conveyor station, used to place clients along the belt.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConveyorSpec {
    pub transfer_time: f64,
    #[serde(default)]
    pub time_base: TimeBase,
    #[serde(default)]
    pub direction: ConveyorDirection,
}

impl ConveyorSpec {
    pub fn transfer_millis(&self) -> f64 {
        self.time_base.to_millis(self.transfer_time)
    }
}

/// One routing record of a way point.
///
/// A transporter moving from `station_a` to `station_b` passes this way
/// point; records of all way points for the same station pair are sorted by
/// `index`. A station name of `"*"` matches every transport station on the
/// way point's surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WayPointRecord {
    pub station_a: String,
    pub station_b: String,
    pub index: u32,
}

impl WayPointRecord {
    pub const WILDCARD: &'static str = "*";

    pub fn new(station_a: impl Into<String>, station_b: impl Into<String>, index: u32) -> Self {
        Self {
            station_a: station_a.into(),
            station_b: station_b.into(),
            index,
        }
    }
}

/// What kind of model element an anchor is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    /// Any ordinary processing box (source, process, dispose, ...).
    Box,
    Conveyor(ConveyorSpec),
    /// Connection junction; has at most one outgoing edge.
    Vertex,
    WayPoint {
        #[serde(default)]
        records: Vec<WayPointRecord>,
    },
    TeleportSource,
    TeleportDestination,
    TransportSource,
    TransportDestination,
    TransportParking,
    TransporterSource,
    /// Clients entering this station are animated immediately instead of
    /// being batched with other moves at the same instant.
    ForceMove,
    /// Box holding an inner surface of its own.
    SubModel,
}

impl StationKind {
    /// Whether the element is drawn as a box that icons can sit on.
    pub fn is_box(&self) -> bool {
        !matches!(self, StationKind::Vertex | StationKind::WayPoint { .. })
    }

    /// Transport-capable stations take part in way-point routing.
    pub fn is_transport_station(&self) -> bool {
        matches!(
            self,
            StationKind::TransportSource
                | StationKind::TransportDestination
                | StationKind::TransportParking
                | StationKind::TransporterSource
        )
    }
}

/// Line drawing style of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineMode {
    #[default]
    Direct,
    Orthogonal,
    OrthogonalRounded,
    Curved,
}

/// A positioned model element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: StationId,
    pub name: String,
    pub kind: StationKind,
    pub bounds: Bounds,
    #[serde(default)]
    pub surface: SurfaceId,
}

/// Directed edge between two anchors. `line_mode` of `None` inherits the
/// model's default style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: StationId,
    pub to: StationId,
    #[serde(default)]
    pub line_mode: Option<LineMode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceModel {
    anchors: BTreeMap<StationId, Anchor>,
    connections: Vec<Connection>,
    default_line_mode: LineMode,
}

impl SurfaceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_line_mode(mut self, mode: LineMode) -> Self {
        self.default_line_mode = mode;
        self
    }

    pub fn default_line_mode(&self) -> LineMode {
        self.default_line_mode
    }

    pub fn set_default_line_mode(&mut self, mode: LineMode) {
        self.default_line_mode = mode;
    }

    /// Insert (or replace) an anchor.
    pub fn add_anchor(&mut self, anchor: Anchor) -> &mut Self {
        self.anchors.insert(anchor.id, anchor);
        self
    }

    /// Add an element on the main surface.
    pub fn add_station(
        &mut self,
        id: StationId,
        name: impl Into<String>,
        kind: StationKind,
        bounds: Bounds,
    ) -> &mut Self {
        self.add_anchor(Anchor {
            id,
            name: name.into(),
            kind,
            bounds,
            surface: SurfaceId::Main,
        })
    }

    /// Add an element on the inner surface of sub-model `parent`.
    pub fn add_sub_station(
        &mut self,
        parent: StationId,
        id: StationId,
        name: impl Into<String>,
        kind: StationKind,
        bounds: Bounds,
    ) -> &mut Self {
        self.add_anchor(Anchor {
            id,
            name: name.into(),
            kind,
            bounds,
            surface: SurfaceId::Sub(parent),
        })
    }

    pub fn connect(&mut self, from: StationId, to: StationId, line_mode: Option<LineMode>) -> &mut Self {
        self.connections.push(Connection {
            from,
            to,
            line_mode,
        });
        self
    }

    pub fn anchor(&self, id: StationId) -> Option<&Anchor> {
        self.anchors.get(&id)
    }

    /// The anchor with `id` if it is a box on the main surface.
    pub fn main_box(&self, id: StationId) -> Option<&Anchor> {
        self.anchor(id)
            .filter(|a| a.surface == SurfaceId::Main && a.kind.is_box())
    }

    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Outgoing connections of `id`, in insertion order.
    pub fn outgoing(&self, id: StationId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.from == id)
    }

    /// Effective line style between two anchors: the first connection
    /// `from -> to` decides, inheriting the model default when it has no
    /// style of its own. Anchors without a connection are joined directly.
    pub fn line_mode(&self, from: StationId, to: StationId) -> LineMode {
        self.connections
            .iter()
            .find(|c| c.from == from && c.to == to)
            .map(|c| c.line_mode.unwrap_or(self.default_line_mode))
            .unwrap_or(LineMode::Direct)
    }

    /// Map a station id to the id visible on the main surface.
    ///
    /// Stations inside a sub-model resolve to the sub-model box; main
    /// surface stations and unknown ids map to themselves.
    pub fn station_at_main_level(&self, id: StationId) -> StationId {
        match self.anchor(id).map(|a| a.surface) {
            Some(SurfaceId::Sub(parent)) => parent,
            _ => id,
        }
    }

    pub fn station_by_name(&self, name: &str) -> Option<&Anchor> {
        self.anchors.values().find(|a| a.name == name)
    }

    /// Ids of all transport-capable stations on `surface`.
    pub fn transport_stations_on(&self, surface: SurfaceId) -> Vec<StationId> {
        self.anchors
            .values()
            .filter(|a| a.surface == surface && a.kind.is_transport_station())
            .map(|a| a.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
