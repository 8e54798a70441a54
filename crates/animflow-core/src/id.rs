use serde::{Deserialize, Serialize};

/// Identifies a station, vertex or way point in the model graph.
///
/// Station ids are assigned by the model editor and stay stable for the
/// lifetime of a model, so they are safe to use as cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationId(pub u32);

/// Opaque identity of a mobile entity (client, operator or transporter).
///
/// Two snapshots of the same simulation object carry the same key, so list
/// reconciliation compares keys instead of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntityKey(pub u64);

/// The drawing surface an anchor lives on: the animated main surface or the
/// inner surface of a sub-model box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceId {
    #[default]
    Main,
    Sub(StationId),
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_ids_order_by_value() {
        let mut ids = vec![StationId(7), StationId(2), StationId(5)];
        ids.sort();
        assert_eq!(ids, vec![StationId(2), StationId(5), StationId(7)]);
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(EntityKey(1), "client");
        map.insert(EntityKey(2), "transporter");
        assert_eq!(map[&EntityKey(1)], "client");
    }

    #[test]
    fn surface_defaults_to_main() {
        assert_eq!(SurfaceId::default(), SurfaceId::Main);
        assert_ne!(SurfaceId::Sub(StationId(3)), SurfaceId::Main);
    }

    #[test]
    fn station_id_display() {
        assert_eq!(StationId(12).to_string(), "#12");
    }
}
