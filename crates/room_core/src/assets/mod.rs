//! Per-asset loading and instantiation.
//!
//! An [`AssetLoader`] owns the runtime state of one declared asset. Loading
//! fetches the primary geometry plus whatever it references (materials,
//! textures, buffers) and rewrites those references to local cache paths.
//! Instantiating imports the staged file into the host once and duplicates
//! the imported objects for every later placement.
//!
//! Only the primary geometry is required. Missing materials, textures or
//! buffers are logged and the import goes ahead without them.

mod dae;
mod fbx;
mod gltf;
mod obj;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache::{FetchCache, FetchError, Retrieved, Transport};
use crate::host::{Host, HostError, ObjectHandle};
use crate::locator::resolve;
use crate::markup::{AssetDeclaration, FormatKind, PlacementDeclaration};
use crate::placement::{apply_transform, compute_transform, duplicate_and_apply};

/// Errors that are fatal for one asset (and so for the placement using it).
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to fetch {locator}: {source}")]
    Fetch {
        locator: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Host import of {0} produced no objects")]
    EmptyImport(PathBuf),

    #[error("{0} failed to fetch earlier in this import")]
    Unavailable(String),
}

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Mutable state of one asset across the placements that use it.
#[derive(Clone, Debug, Default)]
pub struct AssetRuntimeState {
    /// Fetching and reference rewriting are done
    pub loaded: bool,

    /// The host import has happened and `host_objects` is the canonical set
    pub imported: bool,

    /// Resolved locator of the primary geometry
    pub source_locator: Option<String>,

    /// Local copy of the primary geometry
    pub source_path: Option<PathBuf>,

    /// Local copy of the material library, if one was resolved
    pub material_path: Option<PathBuf>,

    /// File actually handed to the host (may be a rewritten copy)
    pub import_path: Option<PathBuf>,

    /// Resolved image locator -> local path, for this asset only
    pub cached_images: HashMap<String, PathBuf>,

    /// Objects created by the first import
    pub host_objects: Vec<ObjectHandle>,

    /// The primary fetch failed; it is not attempted again
    pub unavailable: bool,
}

/// Loader for one asset declaration.
#[derive(Debug)]
pub struct AssetLoader {
    declaration: AssetDeclaration,
    base: String,
    state: AssetRuntimeState,
}

impl AssetLoader {
    /// Loader whose relative sources resolve against `base`.
    pub fn new(declaration: AssetDeclaration, base: impl Into<String>) -> Self {
        Self {
            declaration,
            base: base.into(),
            state: AssetRuntimeState::default(),
        }
    }

    pub fn state(&self) -> &AssetRuntimeState {
        &self.state
    }

    /// Fetch the asset and rewrite its references. A no-op once loaded.
    ///
    /// Returns the path to hand to the host importer.
    pub fn load<T: Transport>(&mut self, cache: &FetchCache<T>) -> AssetResult<PathBuf> {
        if self.state.loaded {
            if let Some(path) = &self.state.import_path {
                return Ok(path.clone());
            }
        }

        let locator = resolve(&self.base, &self.declaration.source_locator);
        if self.state.unavailable {
            return Err(AssetError::Unavailable(locator));
        }
        let primary = match cache.retrieve(&self.declaration.source_locator, &self.base) {
            Ok(primary) => primary,
            Err(source) => {
                self.state.unavailable = true;
                return Err(AssetError::Fetch { locator, source });
            }
        };
        self.state.source_locator = Some(primary.locator.clone());
        self.state.source_path = Some(primary.path.clone());

        let import_path = match self.declaration.format_kind {
            FormatKind::Mesh => obj::load(&self.declaration, &self.base, &mut self.state, cache, &primary),
            FormatKind::Interchange => dae::load(&mut self.state, cache, &primary),
            FormatKind::GlTF => gltf::load(&mut self.state, cache, &primary),
            FormatKind::Fbx => fbx::load(&primary),
        };

        log::debug!("Loaded asset '{}' ({})", self.declaration.id, import_path.display());
        self.state.import_path = Some(import_path.clone());
        self.state.loaded = true;
        Ok(import_path)
    }

    /// Place one instance of the asset and return its host objects.
    ///
    /// The first call imports the staged file and renames the root object
    /// to the asset id; later calls duplicate the objects of that import.
    pub fn instantiate<T, H>(
        &mut self,
        placement: &PlacementDeclaration,
        cache: &FetchCache<T>,
        host: &mut H,
    ) -> AssetResult<Vec<ObjectHandle>>
    where
        T: Transport,
        H: Host + ?Sized,
    {
        let import_path = self.load(cache)?;
        let transform = compute_transform(placement);

        if self.state.imported {
            let copies = duplicate_and_apply(host, &self.state.host_objects, &transform)?;
            return Ok(copies);
        }

        let handles = host.import(self.declaration.format_kind, &import_path)?;
        let Some(&root) = handles.first() else {
            return Err(AssetError::EmptyImport(import_path));
        };
        log::info!(
            "Imported '{}' as {} object(s) from {}",
            self.declaration.id,
            handles.len(),
            import_path.display()
        );
        // The objects exist in the host from here on, whatever happens next
        self.state.host_objects = handles.clone();
        self.state.imported = true;

        host.rename(root, &self.declaration.id)?;
        apply_transform(host, &handles, &transform)?;
        Ok(handles)
    }
}

/// Fetch an image referenced from `base`, at most once per asset.
///
/// Failures are logged and give `None`; the reference is then left as-is.
fn fetch_image<T: Transport>(
    state: &mut AssetRuntimeState,
    cache: &FetchCache<T>,
    reference: &str,
    base: &str,
) -> Option<PathBuf> {
    let resolved = resolve(base, reference);
    if let Some(path) = state.cached_images.get(&resolved) {
        return Some(path.clone());
    }
    match cache.retrieve(reference, base) {
        Ok(image) => {
            state.cached_images.insert(resolved, image.path.clone());
            Some(image.path)
        }
        Err(err) => {
            log::warn!("Skipping image {}: {}", resolved, err);
            None
        }
    }
}

/// Fetch an auxiliary file (material, buffer); failures are logged.
fn fetch_auxiliary<T: Transport>(cache: &FetchCache<T>, reference: &str, base: &str) -> Option<Retrieved> {
    match cache.retrieve(reference, base) {
        Ok(retrieved) => Some(retrieved),
        Err(err) => {
            log::warn!("Skipping {}: {}", resolve(base, reference), err);
            None
        }
    }
}

/// How a file in `dir` should refer to `target`: its file name when they
/// share a directory, its full path otherwise.
fn reference_for(target: &Path, dir: Option<&Path>) -> String {
    match (target.parent(), dir, target.file_name()) {
        (Some(parent), Some(dir), Some(name)) if parent == dir => name.to_string_lossy().into_owned(),
        _ => target.to_string_lossy().into_owned(),
    }
}

fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) => {
            log::warn!("Could not read {}: {}", path.display(), err);
            None
        }
    }
}

fn write_text(path: &Path, text: &str) -> bool {
    match fs::write(path, text) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("Could not write {}: {}", path.display(), err);
            false
        }
    }
}

/// Case-insensitive check for one of `extensions` (given with leading dots).
fn has_extension(reference: &str, extensions: &[&str]) -> bool {
    let lower = reference.to_ascii_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext) && lower.len() > ext.len())
}
