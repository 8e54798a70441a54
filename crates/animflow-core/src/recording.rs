//! Full-recording accumulation and export.
//!
//! While full recording is on, every painted frame is folded into an
//! accumulator: static icons are replaced per entity, moving icons are
//! appended to a per-entity track. [`RecordingAccumulator::export`] turns
//! the accumulated state into a [`StepInfo`] for one simulation instant and
//! starts a fresh accumulation.
//!
//! A moving record carries, besides its motion samples, one "pre" sample
//! (where the entity sat before it started moving) and one "post" sample
//! (where it settled afterwards), so a replay can interpolate without gaps.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityKind, EntityTag};
use crate::icons::DrawIcon;
use crate::id::StationId;

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("failed to encode recording: {0}")]
    Encode(String),
    #[error("failed to decode recording: {0}")]
    Decode(String),
    #[error("failed to serialize step info as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One exported icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconRecord {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub icon: String,
    pub source_station: Option<StationId>,
    pub destination_station: Option<StationId>,
    pub kind: EntityKind,
    pub id: u64,
    pub type_name: String,
    /// Carried over from an earlier export at the same instant.
    pub stale: bool,
}

/// Motion of one entity during an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingRecord {
    pub source_station: Option<StationId>,
    pub destination_station: Option<StationId>,
    pub pre: Option<IconRecord>,
    pub samples: Vec<IconRecord>,
    pub post: Option<IconRecord>,
}

/// Everything drawn at one simulation instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Simulation time in milliseconds.
    pub time: u64,
    pub static_icons: Vec<IconRecord>,
    pub moving: Vec<MovingRecord>,
}

impl StepInfo {
    pub fn to_json(&self) -> Result<String, RecordingError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.static_icons.is_empty() && self.moving.is_empty()
    }
}

/// A sequence of exported steps, stored compactly with bitcode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingLog {
    pub steps: Vec<StepInfo>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: StepInfo) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, RecordingError> {
        bitcode::serialize(self).map_err(|e| RecordingError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RecordingError> {
        bitcode::deserialize(bytes).map_err(|e| RecordingError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone)]
struct Track {
    entity: EntityTag,
    samples: Vec<DrawIcon>,
    stale: bool,
}

impl Track {
    fn push(&mut self, icon: DrawIcon) {
        if self.samples.last() != Some(&icon) {
            self.samples.push(icon);
        }
    }
}

#[derive(Debug, Clone)]
struct StaticEntry {
    icon: DrawIcon,
    stale: bool,
}

/// Accumulates painted frames between exports.
#[derive(Debug, Default)]
pub struct RecordingAccumulator {
    statics: Vec<StaticEntry>,
    tracks: Vec<Track>,
    previous_statics: Vec<StaticEntry>,
    previous_tracks: Vec<Track>,
    last_export: Option<u64>,
}

impl RecordingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Fold one painted frame into the accumulation.
    pub fn add_frame(&mut self, statics: &[Arc<DrawIcon>], moving: &[DrawIcon]) {
        for icon in statics {
            self.add_or_replace_static(icon);
        }
        for icon in moving {
            self.add_or_extend_moving(icon);
        }
    }

    /// A static icon normally replaces the entity's previous static entry.
    /// An entity that just finished moving instead closes its track with a
    /// post sample and leaves the static list.
    fn add_or_replace_static(&mut self, icon: &DrawIcon) {
        let existing = self
            .statics
            .iter()
            .position(|e| e.icon.is_same_entity(icon));

        if icon.source != icon.destination {
            if let Some(track) = self.tracks.iter_mut().find(|t| t.entity.is_same(&icon.entity)) {
                track.push(icon.with_stations(None, icon.destination));
                if let Some(index) = existing {
                    self.statics.remove(index);
                }
                return;
            }
        }

        let entry = StaticEntry {
            icon: icon.clone(),
            stale: false,
        };
        match existing {
            Some(index) => self.statics[index] = entry,
            None => self.statics.push(entry),
        }
    }

    /// Append a motion sample. The first sample of an entity opens its
    /// track, moving the entity's static entry into it as pre sample.
    fn add_or_extend_moving(&mut self, icon: &DrawIcon) {
        if let Some(track) = self.tracks.iter_mut().find(|t| t.entity.is_same(&icon.entity)) {
            track.push(icon.clone());
            return;
        }

        let mut track = Track {
            entity: icon.entity.clone(),
            samples: Vec::new(),
            stale: false,
        };
        if let Some(index) = self
            .statics
            .iter()
            .position(|e| e.icon.is_same_entity(icon))
        {
            let parked = self.statics.remove(index).icon;
            track.push(parked.with_stations(None, parked.destination));
        }
        track.push(icon.clone());
        self.tracks.push(track);
    }

    /// Export the accumulated state as the step at `time` and start over.
    ///
    /// A second export at the same instant also carries entities from the
    /// previous export that did not show up again, flagged as stale.
    pub fn export(&mut self, time: u64, icon_size: i32, client_types: &[String]) -> StepInfo {
        let mut statics = std::mem::take(&mut self.statics);
        let mut tracks = std::mem::take(&mut self.tracks);

        if self.last_export == Some(time) {
            let mut carried_statics: Vec<_> = self
                .previous_statics
                .drain(..)
                .filter(|old| !statics.iter().any(|e| e.icon.is_same_entity(&old.icon)))
                .map(|old| StaticEntry { stale: true, ..old })
                .collect();
            carried_statics.append(&mut statics);
            statics = carried_statics;

            let mut carried_tracks: Vec<_> = self
                .previous_tracks
                .drain(..)
                .filter(|old| !tracks.iter().any(|t| t.entity.is_same(&old.entity)))
                .map(|old| Track { stale: true, ..old })
                .collect();
            carried_tracks.append(&mut tracks);
            tracks = carried_tracks;
        }
        self.last_export = Some(time);

        let to_record = |icon: &DrawIcon, stale: bool| IconRecord {
            x: icon.x,
            y: icon.y,
            w: icon_size,
            h: icon_size,
            icon: icon.icon.to_string(),
            source_station: icon.source,
            destination_station: icon.destination,
            kind: icon.entity.kind(),
            id: icon.entity.key().0,
            type_name: icon.entity.type_name(client_types),
            stale,
        };

        let static_icons = statics.iter().map(|e| to_record(&e.icon, e.stale)).collect();
        let moving = tracks
            .iter()
            .map(|track| {
                let (source, destination) = track
                    .samples
                    .iter()
                    .find(|s| s.source.is_some() && s.destination.is_some())
                    .map_or((None, None), |s| (s.source, s.destination));
                let tagged = |s: &DrawIcon| to_record(&s.with_stations(source, destination), track.stale);
                let pre = track
                    .samples
                    .iter()
                    .find(|s| s.source.is_none() && s.destination == source)
                    .map(tagged);
                let post = track
                    .samples
                    .iter()
                    .find(|s| s.source.is_none() && s.destination == destination)
                    .map(tagged);
                let samples = track
                    .samples
                    .iter()
                    .filter(|s| s.source.is_some() && s.destination.is_some())
                    .map(|s| to_record(s, track.stale))
                    .collect();
                MovingRecord {
                    source_station: source,
                    destination_station: destination,
                    pre,
                    samples,
                    post,
                }
            })
            .collect();

        self.previous_statics = statics;
        self.previous_tracks = tracks;

        StepInfo {
            time,
            static_icons,
            moving,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ClientRef;
    use crate::id::EntityKey;

    fn icon(key: u64, x: i32, source: Option<u32>, destination: Option<u32>) -> DrawIcon {
        DrawIcon {
            x,
            y: 0,
            icon: Arc::from("user"),
            source: source.map(StationId),
            destination: destination.map(StationId),
            entity: EntityTag::from(&ClientRef::new(key)),
        }
    }

    fn parked(key: u64, x: i32, source: Option<u32>, destination: Option<u32>) -> Arc<DrawIcon> {
        Arc::new(icon(key, x, source, destination))
    }

    fn names() -> Vec<String> {
        vec!["Customer".to_string()]
    }

    #[test]
    fn statics_replace_per_entity() {
        let mut acc = RecordingAccumulator::new();
        acc.add_frame(&[parked(1, 10, None, Some(1))], &[]);
        acc.add_frame(&[parked(1, 20, None, Some(1)), parked(2, 30, None, Some(1))], &[]);
        let step = acc.export(0, 25, &names());
        assert_eq!(step.static_icons.len(), 2);
        assert_eq!(step.static_icons[0].x, 20);
        assert_eq!(step.static_icons[0].type_name, "Customer");
        assert_eq!(step.static_icons[0].w, 25);
        assert!(step.moving.is_empty());
    }

    #[test]
    fn movement_has_pre_samples_and_post() {
        let mut acc = RecordingAccumulator::new();
        // Waiting at station 1.
        acc.add_frame(&[parked(1, 0, Some(9), Some(1))], &[]);
        // Moving 1 -> 2.
        acc.add_frame(&[], &[icon(1, 10, Some(1), Some(2))]);
        acc.add_frame(&[], &[icon(1, 20, Some(1), Some(2))]);
        acc.add_frame(&[], &[icon(1, 20, Some(1), Some(2))]);
        // Settled at station 2.
        acc.add_frame(&[parked(1, 30, Some(1), Some(2))], &[]);

        let step = acc.export(100, 25, &names());
        assert!(step.static_icons.is_empty());
        assert_eq!(step.moving.len(), 1);
        let m = &step.moving[0];
        assert_eq!(m.source_station, Some(StationId(1)));
        assert_eq!(m.destination_station, Some(StationId(2)));
        assert_eq!(m.samples.iter().map(|s| s.x).collect::<Vec<_>>(), vec![10, 20]);
        let pre = m.pre.as_ref().unwrap();
        assert_eq!(pre.x, 0);
        assert_eq!(pre.source_station, Some(StationId(1)));
        assert_eq!(pre.destination_station, Some(StationId(2)));
        let post = m.post.as_ref().unwrap();
        assert_eq!(post.x, 30);
        assert_eq!(post.id, 1);
    }

    #[test]
    fn export_resets_accumulation() {
        let mut acc = RecordingAccumulator::new();
        acc.add_frame(&[parked(1, 0, None, Some(1))], &[]);
        acc.export(0, 25, &names());
        let next = acc.export(10, 25, &names());
        assert!(next.is_empty());
    }

    #[test]
    fn same_instant_export_carries_missing_entities_as_stale() {
        let mut acc = RecordingAccumulator::new();
        acc.add_frame(&[parked(1, 0, None, Some(1)), parked(2, 5, None, Some(1))], &[]);
        acc.export(50, 25, &names());

        acc.add_frame(&[parked(2, 7, None, Some(1))], &[icon(3, 1, Some(1), Some(2))]);
        let step = acc.export(50, 25, &names());
        let by_id: Vec<_> = step.static_icons.iter().map(|r| (r.id, r.x, r.stale)).collect();
        assert_eq!(by_id, vec![(1, 0, true), (2, 7, false)]);
        assert_eq!(step.moving.len(), 1);
        assert!(!step.moving[0].samples[0].stale);
    }

    #[test]
    fn later_instant_drops_entities_not_seen_again() {
        let mut acc = RecordingAccumulator::new();
        acc.add_frame(&[parked(1, 0, None, Some(1))], &[]);
        acc.export(50, 25, &names());
        acc.add_frame(&[parked(2, 0, None, Some(1))], &[]);
        let step = acc.export(60, 25, &names());
        assert_eq!(step.static_icons.len(), 1);
        assert_eq!(step.static_icons[0].id, 2);
    }

    #[test]
    fn json_field_names() {
        let mut acc = RecordingAccumulator::new();
        acc.add_frame(&[parked(1, 0, None, Some(1))], &[]);
        let json = acc.export(5, 25, &names()).to_json().unwrap();
        assert!(json.contains("\"static_icons\""));
        assert!(json.contains("\"kind\":\"client\""));
        assert!(json.contains("\"destination_station\":1"));
    }

    #[test]
    fn log_survives_bitcode() {
        let mut acc = RecordingAccumulator::new();
        acc.add_frame(&[parked(1, 0, None, Some(1))], &[icon(2, 4, Some(1), Some(2))]);
        let mut log = RecordingLog::new();
        log.push(acc.export(5, 25, &names()));
        let bytes = log.encode().unwrap();
        let back = RecordingLog::decode(&bytes).unwrap();
        assert_eq!(back, log);
        assert_eq!(back.steps[0].moving[0].samples[0].id, EntityKey(2).0);
    }
}
