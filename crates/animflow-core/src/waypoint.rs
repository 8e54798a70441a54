//! Anchor chains for movements.
//!
//! Clients follow the connection graph: from the source box through any
//! number of vertices to the destination box. Transporters are not bound to
//! connections; they pass the way points whose records name their station
//! pair, in record index order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::entity::EntityKind;
use crate::id::{StationId, SurfaceId};
use crate::model::{StationKind, SurfaceModel, WayPointRecord};

/// Precomputed transporter way points per station pair, plus client chain
/// discovery over the connection graph.
#[derive(Debug, Clone, Default)]
pub struct WayPointRouter {
    transporter_routes: HashMap<(StationId, StationId), Vec<StationId>>,
}

impl WayPointRouter {
    pub fn new(model: &SurfaceModel) -> Self {
        let mut ordered: HashMap<(StationId, StationId), BTreeMap<u32, StationId>> = HashMap::new();

        for way_point in model.anchors() {
            let StationKind::WayPoint { records } = &way_point.kind else {
                continue;
            };
            for record in records {
                let from = resolve(model, &record.station_a, way_point.surface);
                let to = resolve(model, &record.station_b, way_point.surface);
                for &a in &from {
                    for &b in &to {
                        if !same_surface(model, a, b, way_point.surface) {
                            continue;
                        }
                        ordered
                            .entry((a, b))
                            .or_default()
                            .insert(record.index, way_point.id);
                    }
                }
            }
        }

        let transporter_routes = ordered
            .into_iter()
            .map(|(pair, by_index)| (pair, by_index.into_values().collect()))
            .collect();
        Self { transporter_routes }
    }

    /// Way points between two transport stations, in index order. Empty if
    /// no record covers the pair.
    pub fn way_points(&self, from: StationId, to: StationId) -> &[StationId] {
        self.transporter_routes
            .get(&(from, to))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Full anchor chain for a transporter: `from`, its way points, `to`.
    pub fn transporter_chain(&self, from: StationId, to: StationId) -> Vec<StationId> {
        let mut chain = Vec::with_capacity(self.way_points(from, to).len() + 2);
        chain.push(from);
        chain.extend_from_slice(self.way_points(from, to));
        chain.push(to);
        chain
    }

    /// Anchor chain for a client following connections from `from` to `to`
    /// through vertices.
    ///
    /// Outgoing connections of `from` are tried in model order; the first
    /// one whose vertex chain ends at `to` wins. A vertex is left through its
    /// first outgoing connection only; scenes with branching vertices are
    /// rejected at load time. `None` for teleport pairs, and when no
    /// connection leads there. A vertex chain that loops back on itself is
    /// abandoned.
    pub fn client_chain(&self, model: &SurfaceModel, from: StationId, to: StationId) -> Option<Vec<StationId>> {
        if is_teleport(model, from, to) {
            return None;
        }

        'edges: for start in model.outgoing(from) {
            let mut chain = vec![from];
            let mut visited = HashSet::from([from]);
            let mut target = start.to;
            loop {
                if target == to {
                    chain.push(to);
                    return Some(chain);
                }
                let is_vertex = model
                    .anchor(target)
                    .is_some_and(|a| a.kind == StationKind::Vertex);
                if !is_vertex || !visited.insert(target) {
                    continue 'edges;
                }
                chain.push(target);
                match model.outgoing(target).next() {
                    Some(edge) => target = edge.to,
                    None => continue 'edges,
                }
            }
        }
        None
    }

    /// Anchor chain for `kind` moving between two stations.
    ///
    /// Clients without a usable connection chain fall back to the direct
    /// pair, except teleport pairs which have no visible route at all.
    pub fn route_for(
        &self,
        model: &SurfaceModel,
        kind: EntityKind,
        from: StationId,
        to: StationId,
    ) -> Option<Vec<StationId>> {
        match kind {
            EntityKind::Transporter => Some(self.transporter_chain(from, to)),
            _ => {
                if is_teleport(model, from, to) {
                    return None;
                }
                Some(self.client_chain(model, from, to).unwrap_or_else(|| vec![from, to]))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transporter_routes.is_empty()
    }
}

/// Teleport transitions are invisible by design of the model.
pub fn is_teleport(model: &SurfaceModel, from: StationId, to: StationId) -> bool {
    let kind = |id| model.anchor(id).map(|a| &a.kind);
    matches!(kind(from), Some(StationKind::TeleportSource))
        && matches!(kind(to), Some(StationKind::TeleportDestination))
}

/// Station ids a record name refers to.
fn resolve(model: &SurfaceModel, name: &str, surface: SurfaceId) -> Vec<StationId> {
    if name == WayPointRecord::WILDCARD {
        return model.transport_stations_on(surface);
    }
    model
        .anchors()
        .filter(|a| a.name == name && a.kind.is_transport_station())
        .map(|a| a.id)
        .collect()
}

fn same_surface(model: &SurfaceModel, a: StationId, b: StationId, surface: SurfaceId) -> bool {
    let on = |id| model.anchor(id).is_some_and(|anchor| anchor.surface == surface);
    on(a) && on(b)
}
