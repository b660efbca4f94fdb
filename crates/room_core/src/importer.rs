//! End-to-end room import.
//!
//! Reads a room document, builds one [`AssetLoader`] per declared asset and
//! places every object in document order. Only structural problems with the
//! document itself abort an import; a placement that cannot be resolved or
//! loaded is logged, recorded in the report and skipped.

use std::collections::HashMap;
use std::io;

use thiserror::Error;

use crate::assets::AssetLoader;
use crate::cache::{DefaultTransport, FetchCache, FetchError, Transport};
use crate::config::{ImportConfig, PrimitiveCatalog};
use crate::host::Host;
use crate::locator::{document_location, is_remote};
use crate::markup::{parse_room, AssetDeclaration, MarkupError, PlacementDeclaration};
use crate::placement::{compute_transform, PlacementError};
use crate::scene::{ImportReport, PlacedObject, PlacementFailure};

/// Errors that abort a whole import.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("Failed to read room document {locator}: {source}")]
    Document {
        locator: String,
        #[source]
        source: FetchError,
    },

    #[error("Cache unavailable: {0}")]
    Cache(#[source] FetchError),

    #[error("Could not locate {source_path}: {source}")]
    Io {
        source_path: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for imports.
pub type ImportResult<T> = Result<T, ImportError>;

/// Room importer over a fetch cache.
pub struct Importer<T: Transport = DefaultTransport> {
    cache: FetchCache<T>,
    primitives: PrimitiveCatalog,
}

impl Importer<DefaultTransport> {
    /// Importer using the network and working directory named by `config`.
    pub fn from_config(config: &ImportConfig) -> ImportResult<Self> {
        let transport = DefaultTransport::new(config.timeout(), &config.user_agent);
        let cache = FetchCache::new(&config.working_dir, transport).map_err(ImportError::Cache)?;
        Ok(Self::new(cache, config.primitive_catalog()))
    }
}

impl<T: Transport> Importer<T> {
    pub fn new(cache: FetchCache<T>, primitives: PrimitiveCatalog) -> Self {
        Self { cache, primitives }
    }

    pub fn cache(&self) -> &FetchCache<T> {
        &self.cache
    }

    pub fn primitives(&self) -> &PrimitiveCatalog {
        &self.primitives
    }

    /// Import the room at `source`, a URL or a local path.
    pub fn import_document<H: Host + ?Sized>(&self, source: &str, host: &mut H) -> ImportResult<ImportReport> {
        let location = document_location(source).map_err(|source_err| ImportError::Io {
            source_path: source.to_string(),
            source: source_err,
        })?;

        log::info!("Loading room {}", location.locator);
        let bytes = self.cache.read(&location.locator).map_err(|source| ImportError::Document {
            locator: location.locator.clone(),
            source,
        })?;

        let mut report = self.import_bytes(&bytes, &location.base, host)?;
        report.document = location.locator;
        Ok(report)
    }

    /// Import a room document already in memory; relative sources resolve
    /// against `base`.
    pub fn import_bytes<H: Host + ?Sized>(&self, bytes: &[u8], base: &str, host: &mut H) -> ImportResult<ImportReport> {
        let room = parse_room(bytes, &self.primitives)?;

        let mut loaders: HashMap<String, AssetLoader> = HashMap::new();
        for asset in room.assets {
            if loaders.contains_key(&asset.id) {
                log::debug!("Ignoring repeated declaration of '{}'", asset.id);
                continue;
            }
            loaders.insert(asset.id.clone(), AssetLoader::new(asset, base));
        }

        let mut report = ImportReport::new(room.settings);
        report.rejected = room.rejected_placements;

        for placement in &room.placements {
            match self.place(&mut loaders, placement, base, host) {
                Ok(placed) => report.placed.push(placed),
                Err(PlacementError::UnknownAsset(id)) => {
                    log::debug!("Skipping object '{}': no such asset", id);
                    report.skipped.push(id);
                }
                Err(err) => {
                    log::warn!("{}", err);
                    report.failed.push(PlacementFailure {
                        asset_id: placement.asset_id.clone(),
                        message: error_chain(&err),
                    });
                }
            }
        }

        log::info!(
            "Placed {} object(s) ({} host objects), {} skipped, {} failed",
            report.placed.len(),
            report.object_count(),
            report.skipped.len(),
            report.failure_count()
        );
        Ok(report)
    }

    fn place<H: Host + ?Sized>(
        &self,
        loaders: &mut HashMap<String, AssetLoader>,
        placement: &PlacementDeclaration,
        base: &str,
        host: &mut H,
    ) -> Result<PlacedObject, PlacementError> {
        let id = &placement.asset_id;
        if !loaders.contains_key(id) && is_remote(id) {
            log::debug!("Treating object '{}' as a remote glTF", id);
            loaders.insert(id.clone(), AssetLoader::new(AssetDeclaration::remote_gltf(id), base));
        }
        let loader = loaders
            .get_mut(id)
            .ok_or_else(|| PlacementError::UnknownAsset(id.clone()))?;

        let handles = loader
            .instantiate(placement, &self.cache, host)
            .map_err(|source| PlacementError::Asset {
                id: id.clone(),
                source,
            })?;

        Ok(PlacedObject {
            asset_id: id.clone(),
            handles,
            transform: compute_transform(placement),
        })
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
