//! Scene and config loading: finds the project files, parses them in
//! whichever format they use, and resolves scenes into a surface model.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use animflow_core::config::AnimatorConfig;
use animflow_core::geometry::Bounds;
use animflow_core::id::StationId;
use animflow_core::model::{StationKind, SurfaceModel, WayPointRecord};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::schema::SceneFile;

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The project directory has no file for a required role.
    #[error("no {file} file (.ron, .toml or .json) in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("{file}: not a .ron, .toml or .json file")]
    UnsupportedFormat { file: PathBuf },

    /// The same project file exists in more than one format.
    #[error("ambiguous project file: both {a} and {b} exist")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A scene refers to a station id it does not define.
    #[error("unresolved {expected_kind} reference {id} in {file}")]
    UnresolvedRef {
        file: PathBuf,
        id: u32,
        expected_kind: &'static str,
    },

    #[error("duplicate station id {id} in {file}")]
    DuplicateId { file: PathBuf, id: u32 },

    /// A vertex leads on to more than one station.
    #[error("vertex {id} in {file} has {outgoing} outgoing connections, at most 1 allowed")]
    BranchingVertex { file: PathBuf, id: u32, outgoing: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Formats
// ===========================================================================

/// Text formats a scene or config file may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    /// Lookup order when a project directory is searched.
    pub const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    pub fn of(path: &Path) -> Result<Format, DataLoadError> {
        let ext = path.extension().and_then(|e| e.to_str());
        Format::ALL
            .into_iter()
            .find(|f| Some(f.extension()) == ext)
            .ok_or_else(|| DataLoadError::UnsupportedFormat {
                file: path.to_path_buf(),
            })
    }

    /// Parse `content`; `path` only labels errors.
    pub fn parse<T: DeserializeOwned>(self, content: &str, path: &Path) -> Result<T, DataLoadError> {
        let detail = match self {
            Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        };
        detail.map_err(|detail| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail,
        })
    }
}

/// The `role` file of a project directory (`scene`, `animator`), in any
/// format. Two formats of the same role are ambiguous.
fn project_file(dir: &Path, role: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut present = Format::ALL
        .into_iter()
        .map(|f| dir.join(format!("{role}.{}", f.extension())))
        .filter(|p| p.is_file());
    let first = present.next();
    if let (Some(a), Some(b)) = (&first, present.next()) {
        return Err(DataLoadError::ConflictingFormats {
            a: a.clone(),
            b,
        });
    }
    Ok(first)
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = Format::of(path)?;
    let content = std::fs::read_to_string(path)?;
    format.parse(&content, path)
}

// ===========================================================================
// Loaders
// ===========================================================================

/// Load an animator configuration. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<AnimatorConfig, DataLoadError> {
    read_file(path)
}

/// Load a scene file into a surface model.
pub fn load_scene(path: &Path) -> Result<SurfaceModel, DataLoadError> {
    let scene: SceneFile = read_file(path)?;
    build_model(&scene, path)
}

/// Resolve a parsed scene into a surface model.
///
/// Duplicate ids, connections to unknown ids, parents that are not known
/// elements and vertices with more than one outgoing connection are errors. Way point records naming no transport station are
/// kept but logged, since the model may still be under construction.
pub fn build_model(scene: &SceneFile, file: &Path) -> Result<SurfaceModel, DataLoadError> {
    let mut ids = HashSet::new();
    for station in &scene.stations {
        if !ids.insert(station.id) {
            return Err(DataLoadError::DuplicateId {
                file: file.to_path_buf(),
                id: station.id,
            });
        }
    }
    let unresolved = |id: u32, expected_kind: &'static str| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        id,
        expected_kind,
    };

    let mut model = SurfaceModel::new().with_default_line_mode(scene.default_line_mode);
    for station in &scene.stations {
        let bounds = Bounds::new(station.x, station.y, station.width, station.height);
        match station.parent {
            None => {
                model.add_station(StationId(station.id), station.name.as_str(), station.kind.clone(), bounds);
            }
            Some(parent) => {
                if !ids.contains(&parent) {
                    return Err(unresolved(parent, "sub-model"));
                }
                model.add_sub_station(
                    StationId(parent),
                    StationId(station.id),
                    station.name.as_str(),
                    station.kind.clone(),
                    bounds,
                );
            }
        }
    }

    for connection in &scene.connections {
        for id in [connection.from, connection.to] {
            if !ids.contains(&id) {
                return Err(unresolved(id, "station"));
            }
        }
        model.connect(StationId(connection.from), StationId(connection.to), connection.line_mode);
    }
    check_vertices(scene, file)?;

    check_way_points(&model, file);
    debug!(
        file = %file.display(),
        stations = model.len(),
        connections = model.connections().len(),
        "scene loaded"
    );
    Ok(model)
}

/// Clients follow a vertex's only outgoing connection, so a vertex may not
/// branch.
fn check_vertices(scene: &SceneFile, file: &Path) -> Result<(), DataLoadError> {
    let vertices: HashSet<u32> = scene
        .stations
        .iter()
        .filter(|s| s.kind == StationKind::Vertex)
        .map(|s| s.id)
        .collect();
    let mut outgoing: HashMap<u32, usize> = HashMap::new();
    for connection in scene.connections.iter().filter(|c| vertices.contains(&c.from)) {
        *outgoing.entry(connection.from).or_default() += 1;
    }
    match outgoing.into_iter().filter(|&(_, n)| n > 1).min() {
        Some((id, outgoing)) => Err(DataLoadError::BranchingVertex {
            file: file.to_path_buf(),
            id,
            outgoing,
        }),
        None => Ok(()),
    }
}

fn check_way_points(model: &SurfaceModel, file: &Path) {
    let known = |name: &str| {
        name == WayPointRecord::WILDCARD
            || model
                .anchors()
                .any(|a| a.name == name && a.kind.is_transport_station())
    };
    for anchor in model.anchors() {
        let StationKind::WayPoint { records } = &anchor.kind else {
            continue;
        };
        for record in records {
            for name in [&record.station_a, &record.station_b] {
                if !known(name) {
                    warn!(
                        file = %file.display(),
                        way_point = %anchor.id,
                        station = %name,
                        "way point record names an unknown transport station"
                    );
                }
            }
        }
    }
}

// ===========================================================================
// Project directories
// ===========================================================================

/// A scene plus the configuration to animate it with.
#[derive(Debug, Clone)]
pub struct Project {
    pub config: AnimatorConfig,
    pub model: SurfaceModel,
}

/// Load `scene.{ron,toml,json}` and, if present, `animator.{ron,toml,json}`
/// from `dir`.
pub fn load_project(dir: &Path) -> Result<Project, DataLoadError> {
    let scene_path = project_file(dir, "scene")?.ok_or_else(|| DataLoadError::MissingRequired {
        file: "scene".to_string(),
        dir: dir.to_path_buf(),
    })?;
    let config = match project_file(dir, "animator")? {
        Some(path) => load_config(&path)?,
        None => AnimatorConfig::default(),
    };
    let model = load_scene(&scene_path)?;
    Ok(Project { config, model })
}

// ===========================================================================
// Tests
// ===========================================================================
