//! Snapshots of the mobile entities the animator draws.
//!
//! The simulation hands out value snapshots; the animator never holds a
//! reference into simulation state. Identity across snapshots is the
//! [`EntityKey`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::id::{EntityKey, StationId};

pub const DEFAULT_CLIENT_ICON: &str = "user";
pub const DEFAULT_OPERATOR_ICON: &str = "status_online";
pub const DEFAULT_TRANSPORTER_ICON: &str = "lorry";
pub const DEFAULT_TRANSPORTER_ICON_WEST: &str = "lorry-left";
pub const DEFAULT_TRANSPORTER_ICON_EMPTY: &str = "lorry-empty";
pub const DEFAULT_TRANSPORTER_ICON_EMPTY_WEST: &str = "lorry-left-empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Operator,
    Transporter,
}

/// A client moving through the station network.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientRef {
    pub key: EntityKey,
    /// Index into the simulation's client type name table.
    pub client_type: usize,
    pub last_station: Option<StationId>,
    pub next_station: Option<StationId>,
    pub icon: Option<String>,
    /// Icon shown while moving; falls back to `icon`.
    pub icon_last: Option<String>,
    /// Batched clients are drawn as part of their batch, never on their own.
    pub batched: bool,
    /// Simulation time (ms) the client started its current conveyor transfer.
    pub transfer_started_at: Option<u64>,
    /// Station whose arrival processing has completed for this client.
    pub arrival_processed_station: Option<StationId>,
}

impl ClientRef {
    pub fn new(key: u64) -> Self {
        Self {
            key: EntityKey(key),
            ..Self::default()
        }
    }

    pub fn moving(key: u64, from: StationId, to: StationId) -> Self {
        Self {
            last_station: Some(from),
            next_station: Some(to),
            ..Self::new(key)
        }
    }

    /// Icon used while the client moves along a path.
    pub fn moving_icon(&self) -> &str {
        self.icon_last
            .as_deref()
            .or(self.icon.as_deref())
            .unwrap_or(DEFAULT_CLIENT_ICON)
    }

    pub fn static_icon(&self) -> &str {
        self.icon.as_deref().unwrap_or(DEFAULT_CLIENT_ICON)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperatorRef {
    pub key: EntityKey,
    /// Name of the operator group, exported as type name.
    pub group: String,
    pub station: Option<StationId>,
    pub icon: Option<String>,
}

impl OperatorRef {
    pub fn icon(&self) -> &str {
        self.icon.as_deref().unwrap_or(DEFAULT_OPERATOR_ICON)
    }
}

/// Per-direction icons of a transporter, empty and loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransporterIcons {
    pub east_empty: Option<String>,
    pub west_empty: Option<String>,
    pub east_loaded: Option<String>,
    pub west_loaded: Option<String>,
}

impl TransporterIcons {
    /// (eastbound, westbound) icons for the given load state.
    pub fn pair(&self, loaded: bool) -> (&str, &str) {
        if loaded {
            (
                self.east_loaded.as_deref().unwrap_or(DEFAULT_TRANSPORTER_ICON),
                self.west_loaded
                    .as_deref()
                    .unwrap_or(DEFAULT_TRANSPORTER_ICON_WEST),
            )
        } else {
            (
                self.east_empty
                    .as_deref()
                    .unwrap_or(DEFAULT_TRANSPORTER_ICON_EMPTY),
                self.west_empty
                    .as_deref()
                    .unwrap_or(DEFAULT_TRANSPORTER_ICON_EMPTY_WEST),
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransporterRef {
    pub key: EntityKey,
    /// Name of the transporter group, exported as type name.
    pub group: String,
    pub last_position: Option<StationId>,
    pub position: Option<StationId>,
    pub in_transfer: bool,
    pub loaded: bool,
    pub icons: TransporterIcons,
}

impl TransporterRef {
    /// Station the transporter is drawn at while parked or loading.
    pub fn resting_station(&self) -> Option<StationId> {
        if self.in_transfer {
            self.last_position
        } else {
            self.position
        }
    }
}

/// Any entity that can trigger a breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Client(ClientRef),
    Operator(OperatorRef),
    Transporter(TransporterRef),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Client(_) => EntityKind::Client,
            Entity::Operator(_) => EntityKind::Operator,
            Entity::Transporter(_) => EntityKind::Transporter,
        }
    }

    pub fn key(&self) -> EntityKey {
        match self {
            Entity::Client(c) => c.key,
            Entity::Operator(o) => o.key,
            Entity::Transporter(t) => t.key,
        }
    }

    /// The station the entity is heading to or occupies.
    pub fn target_station(&self) -> Option<StationId> {
        match self {
            Entity::Client(c) => c.next_station,
            Entity::Operator(o) => o.station,
            Entity::Transporter(t) => t.position,
        }
    }
}

/// Identity carried by every drawn icon, used for list reconciliation and
/// for recording export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityTag {
    Client { key: EntityKey, client_type: usize },
    Operator { key: EntityKey, group: Arc<str> },
    Transporter { key: EntityKey, group: Arc<str> },
}

impl EntityTag {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityTag::Client { .. } => EntityKind::Client,
            EntityTag::Operator { .. } => EntityKind::Operator,
            EntityTag::Transporter { .. } => EntityKind::Transporter,
        }
    }

    pub fn key(&self) -> EntityKey {
        match self {
            EntityTag::Client { key, .. }
            | EntityTag::Operator { key, .. }
            | EntityTag::Transporter { key, .. } => *key,
        }
    }

    /// Same simulation object, regardless of snapshot contents.
    pub fn is_same(&self, other: &EntityTag) -> bool {
        self.kind() == other.kind() && self.key() == other.key()
    }

    /// Exported type name. Client types resolve through the simulation's
    /// name table; an index outside the table yields an empty name.
    pub fn type_name(&self, client_types: &[String]) -> String {
        match self {
            EntityTag::Client { client_type, .. } => {
                client_types.get(*client_type).cloned().unwrap_or_default()
            }
            EntityTag::Operator { group, .. } | EntityTag::Transporter { group, .. } => {
                group.to_string()
            }
        }
    }
}

impl From<&ClientRef> for EntityTag {
    fn from(c: &ClientRef) -> Self {
        EntityTag::Client {
            key: c.key,
            client_type: c.client_type,
        }
    }
}

impl From<&OperatorRef> for EntityTag {
    fn from(o: &OperatorRef) -> Self {
        EntityTag::Operator {
            key: o.key,
            group: Arc::from(o.group.as_str()),
        }
    }
}

impl From<&TransporterRef> for EntityTag {
    fn from(t: &TransporterRef) -> Self {
        EntityTag::Transporter {
            key: t.key,
            group: Arc::from(t.group.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_moving_icon_prefers_last_icon() {
        let mut c = ClientRef::new(1);
        assert_eq!(c.moving_icon(), DEFAULT_CLIENT_ICON);
        c.icon = Some("box".into());
        assert_eq!(c.moving_icon(), "box");
        c.icon_last = Some("box-red".into());
        assert_eq!(c.moving_icon(), "box-red");
        assert_eq!(c.static_icon(), "box");
    }

    #[test]
    fn transporter_icon_defaults() {
        let icons = TransporterIcons::default();
        assert_eq!(icons.pair(true), ("lorry", "lorry-left"));
        assert_eq!(icons.pair(false), ("lorry-empty", "lorry-left-empty"));
    }

    #[test]
    fn transporter_rests_at_last_position_while_in_transfer() {
        let mut t = TransporterRef {
            last_position: Some(StationId(1)),
            position: Some(StationId(2)),
            ..TransporterRef::default()
        };
        assert_eq!(t.resting_station(), Some(StationId(2)));
        t.in_transfer = true;
        assert_eq!(t.resting_station(), Some(StationId(1)));
    }

    #[test]
    fn target_station_per_kind() {
        let c = Entity::Client(ClientRef::moving(1, StationId(1), StationId(2)));
        assert_eq!(c.target_station(), Some(StationId(2)));
        let t = Entity::Transporter(TransporterRef {
            position: Some(StationId(5)),
            ..TransporterRef::default()
        });
        assert_eq!(t.target_station(), Some(StationId(5)));
    }

    #[test]
    fn tags_compare_by_identity() {
        let a = ClientRef::moving(4, StationId(1), StationId(2));
        let mut b = a.clone();
        b.next_station = Some(StationId(9));
        assert!(EntityTag::from(&a).is_same(&EntityTag::from(&b)));

        let op = OperatorRef {
            key: EntityKey(4),
            ..OperatorRef::default()
        };
        assert!(!EntityTag::from(&a).is_same(&EntityTag::from(&op)));
    }

    #[test]
    fn type_name_lookup() {
        let names = vec!["Walk-in".to_string(), "Phone".to_string()];
        let mut c = ClientRef::new(1);
        c.client_type = 1;
        assert_eq!(EntityTag::from(&c).type_name(&names), "Phone");
        c.client_type = 7;
        assert_eq!(EntityTag::from(&c).type_name(&names), "");
    }
}
