//! Import configuration and the built-in primitive catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locator::{file_locator, join};
use crate::markup::{AssetDeclaration, FormatKind};

/// Ids of the bundled primitive meshes, each shipped as `<id>.obj`.
pub const PRIMITIVE_IDS: [&str; 9] = [
    "capsule", "cone", "cube", "cylinder", "pipe", "plane", "pyramid", "sphere", "torus",
];

/// Errors that can occur while reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for an import run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Flat cache directory for fetched and rewritten files
    pub working_dir: PathBuf,

    /// Directory holding the primitive `.obj` files
    pub primitives_dir: PathBuf,

    /// Network timeout in seconds (`None` waits forever)
    pub timeout_secs: Option<u64>,

    /// User-Agent sent with HTTP requests
    pub user_agent: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from(".room_cache"),
            primitives_dir: PathBuf::from("primitives"),
            timeout_secs: Some(30),
            user_agent: concat!("room_import/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ImportConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Build the primitive catalog for this configuration.
    pub fn primitive_catalog(&self) -> PrimitiveCatalog {
        PrimitiveCatalog::new(&self.primitives_dir)
    }
}

/// The fixed set of built-in primitive declarations.
///
/// Built once and handed to the markup parser; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimitiveCatalog {
    directory_locator: String,
    declarations: Vec<AssetDeclaration>,
}

impl PrimitiveCatalog {
    /// Catalog rooted at `directory` (made absolute against the current directory).
    pub fn new(directory: &Path) -> Self {
        let directory = if directory.is_absolute() {
            directory.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(directory))
                .unwrap_or_else(|_| directory.to_path_buf())
        };
        let directory_locator = file_locator(&directory);

        let declarations = PRIMITIVE_IDS
            .iter()
            .map(|id| {
                AssetDeclaration::new(
                    *id,
                    join(&directory_locator, &format!("{}.obj", id)),
                    FormatKind::Mesh,
                )
            })
            .collect();

        Self {
            directory_locator,
            declarations,
        }
    }

    /// `file://` locator of the primitives directory.
    pub fn directory_locator(&self) -> &str {
        &self.directory_locator
    }

    pub fn declarations(&self) -> &[AssetDeclaration] {
        &self.declarations
    }

    pub fn contains(&self, id: &str) -> bool {
        self.declarations.iter().any(|d| d.id == id)
    }
}
