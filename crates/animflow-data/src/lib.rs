//! Loading of animator configuration and scene files.
//!
//! Files are RON, TOML or JSON, detected by extension. A project directory
//! holds a required `scene` file and an optional `animator` config file.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, Project, load_config, load_project, load_scene};
