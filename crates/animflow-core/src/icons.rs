//! Drawn icons and the static icon list.
//!
//! The static list shows every entity that is not currently moving: clients
//! fanned out above the station they wait at, operators and transporters
//! lined up along the bottom edge of theirs. It is rebuilt from scratch
//! around each movement, reusing the previous build's [`DrawIcon`]s where an
//! entity did not move so unchanged icons keep their allocation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::entity::{ClientRef, EntityKind, EntityTag, OperatorRef, TransporterRef};
use crate::geometry::{Point, Size};
use crate::id::{EntityKey, StationId};
use crate::model::{ConveyorDirection, ConveyorSpec, StationKind, SurfaceModel};

/// One icon to draw, with the entity it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawIcon {
    pub x: i32,
    pub y: i32,
    pub icon: Arc<str>,
    /// Station the entity comes from, if known.
    pub source: Option<StationId>,
    /// Station the entity heads to or sits at.
    pub destination: Option<StationId>,
    pub entity: EntityTag,
}

impl DrawIcon {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_same_entity(&self, other: &DrawIcon) -> bool {
        self.entity.is_same(&other.entity)
    }

    /// Copy of this icon with different station tags.
    pub fn with_stations(&self, source: Option<StationId>, destination: Option<StationId>) -> DrawIcon {
        DrawIcon {
            source,
            destination,
            ..self.clone()
        }
    }

    fn matches(&self, x: i32, y: i32, icon: &str, entity: &EntityTag) -> bool {
        self.x == x && self.y == y && &*self.icon == icon && self.entity.is_same(entity)
    }
}

/// Identities of entities that must not appear in the static list.
pub type Exclusions = HashSet<(EntityKind, EntityKey)>;

/// Current simulation entities to lay out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveEntities<'a> {
    pub clients: &'a [ClientRef],
    pub operators: &'a [OperatorRef],
    pub transporters: &'a [TransporterRef],
}

/// Builds the static icon list.
///
/// Keeps per-station counters for the fan-out and a double buffer of the
/// previous build for icon reuse.
#[derive(Debug)]
pub struct StaticIconBuilder {
    icon_size: i32,
    stack_limit: u32,
    default_box: Size,
    clients_at: HashMap<StationId, u32>,
    operators_at: HashMap<StationId, u32>,
    transporters_at: HashMap<StationId, u32>,
    previous: Vec<Arc<DrawIcon>>,
    current: Vec<Arc<DrawIcon>>,
    reused: u64,
}

impl StaticIconBuilder {
    pub fn new(icon_size: i32, stack_limit: u32, default_box: Size) -> Self {
        Self {
            icon_size,
            stack_limit: stack_limit.max(1),
            default_box,
            clients_at: HashMap::new(),
            operators_at: HashMap::new(),
            transporters_at: HashMap::new(),
            previous: Vec::new(),
            current: Vec::new(),
            reused: 0,
        }
    }

    /// Drop both buffers and all counters.
    pub fn clear(&mut self) {
        self.clients_at.clear();
        self.operators_at.clear();
        self.transporters_at.clear();
        self.previous.clear();
        self.current.clear();
        self.reused = 0;
    }

    /// Icons reused from a previous build since the last [`clear`](Self::clear).
    pub fn reused(&self) -> u64 {
        self.reused
    }

    /// Lay out every non-excluded entity. `now` is the simulation time in
    /// milliseconds, used to place clients along conveyors.
    pub fn rebuild(
        &mut self,
        model: &SurfaceModel,
        entities: ActiveEntities<'_>,
        excluded: &Exclusions,
        now: u64,
    ) -> Vec<Arc<DrawIcon>> {
        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.clear();
        self.clients_at.clear();
        self.operators_at.clear();
        self.transporters_at.clear();

        for client in entities.clients {
            if client.batched || excluded.contains(&(EntityKind::Client, client.key)) {
                continue;
            }
            self.place_client(model, client, now);
        }
        for operator in entities.operators {
            if excluded.contains(&(EntityKind::Operator, operator.key)) {
                continue;
            }
            self.place_operator(model, operator);
        }
        for transporter in entities.transporters {
            if excluded.contains(&(EntityKind::Transporter, transporter.key)) {
                continue;
            }
            self.place_transporter(model, transporter);
        }

        self.current.clone()
    }

    fn place_client(&mut self, model: &SurfaceModel, client: &ClientRef, now: u64) {
        let Some(next) = client.next_station else {
            return;
        };
        let station = model.station_at_main_level(next);
        let Some(anchor) = model.main_box(station) else {
            return;
        };
        let size = anchor.bounds.size.or_default(self.default_box);
        let origin = anchor.bounds.origin;

        let (x, y) = match &anchor.kind {
            StationKind::Conveyor(spec) => {
                // Only clients queueing for the belt take a waiting slot.
                let waiting = if is_in_transfer(client, station) {
                    0
                } else {
                    bump(&mut self.clients_at, station)
                };
                let offset = conveyor_offset(spec, client, station, waiting, size.width, self.icon_size, now);
                let x = match spec.direction {
                    ConveyorDirection::LeftToRight => origin.x + offset,
                    ConveyorDirection::RightToLeft => origin.x + size.width - self.icon_size - offset,
                };
                (x, origin.y - self.icon_size / 2)
            }
            _ => {
                let count = bump(&mut self.clients_at, station);
                let (dx, dy) = self.fan_offset(count, size.width);
                (
                    origin.x + size.width - self.icon_size - dx,
                    origin.y - self.icon_size / 2 - dy,
                )
            }
        };

        let entity = EntityTag::from(client);
        self.push(x, y, client.static_icon(), client.last_station, client.next_station, entity);
    }

    fn place_operator(&mut self, model: &SurfaceModel, operator: &OperatorRef) {
        let Some(station) = operator.station else {
            return;
        };
        let Some(anchor) = model.main_box(station) else {
            return;
        };
        let size = anchor.bounds.size.or_default(self.default_box);
        let count = bump(&mut self.operators_at, station);
        let (dx, dy) = self.fan_offset(count, size.width);
        let x = anchor.bounds.origin.x + size.width - self.icon_size - dx;
        let y = anchor.bounds.origin.y + size.height - self.icon_size - dy;
        let entity = EntityTag::from(operator);
        self.push(x, y, operator.icon(), Some(station), Some(station), entity);
    }

    fn place_transporter(&mut self, model: &SurfaceModel, transporter: &TransporterRef) {
        let Some(station) = transporter.resting_station() else {
            return;
        };
        let Some(anchor) = model.main_box(station) else {
            return;
        };
        let size = anchor.bounds.size.or_default(self.default_box);
        let count = bump(&mut self.transporters_at, station);
        let (dx, dy) = self.fan_offset(count, size.width);
        let x = anchor.bounds.origin.x + size.width - self.icon_size - dx;
        let y = anchor.bounds.origin.y + size.height - self.icon_size - dy;
        let (east, _) = transporter.icons.pair(transporter.loaded);
        let entity = EntityTag::from(transporter);
        self.push(x, y, east, transporter.last_position, transporter.position, entity);
    }

    /// Offset of the `count`-th icon at a station: columns step left by a
    /// tenth of the box width, capped at the box width; past `stack_limit`
    /// icons a new row starts half an icon higher.
    fn fan_offset(&self, count: u32, box_width: i32) -> (i32, i32) {
        let row = (count / self.stack_limit) as i32;
        let column = (count % self.stack_limit) as i32;
        let dx = (box_width - self.icon_size).min(column * box_width / 10).max(0);
        let dy = row * self.icon_size / 2;
        (dx, dy)
    }

    fn push(
        &mut self,
        x: i32,
        y: i32,
        icon: &str,
        source: Option<StationId>,
        destination: Option<StationId>,
        entity: EntityTag,
    ) {
        let index = self.current.len();
        let reusable = self
            .previous
            .get(index)
            .filter(|prev| prev.matches(x, y, icon, &entity) && prev.source == source && prev.destination == destination);
        let draw = match reusable {
            Some(prev) => {
                self.reused += 1;
                Arc::clone(prev)
            }
            None => Arc::new(DrawIcon {
                x,
                y,
                icon: Arc::from(icon),
                source,
                destination,
                entity,
            }),
        };
        self.current.push(draw);
    }
}

/// Increment the counter for `station`, returning its previous value.
fn bump(counters: &mut HashMap<StationId, u32>, station: StationId) -> u32 {
    let slot = counters.entry(station).or_insert(0);
    let count = *slot;
    *slot += 1;
    count
}

/// A client is carried by the belt once its transfer started and its
/// arrival at `station` was processed.
fn is_in_transfer(client: &ClientRef, station: StationId) -> bool {
    client.transfer_started_at.is_some() && client.arrival_processed_station == Some(station)
}

/// Distance along the belt from the entry side.
///
/// Clients still queueing for the belt (no transfer started, or arrival at
/// this station not yet processed) bunch up near the entry. Clients in
/// transfer advance linearly from 10% to 100% of the usable width.
fn conveyor_offset(
    spec: &ConveyorSpec,
    client: &ClientRef,
    station: StationId,
    waiting: u32,
    box_width: i32,
    icon_size: i32,
    now: u64,
) -> i32 {
    match client.transfer_started_at {
        Some(start) if is_in_transfer(client, station) => {
            let total = spec.transfer_millis();
            let elapsed = now.saturating_sub(start) as f64;
            let percent = if total > 0.0 {
                (elapsed / total).clamp(0.0, 1.0)
            } else {
                1.0
            };
            (f64::from(box_width - icon_size) * (0.1 + percent * 0.9)).round() as i32
        }
        _ => {
            let tenth = box_width / 10;
            tenth - tenth.min(waiting as i32 * box_width / 20)
        }
    }
}
