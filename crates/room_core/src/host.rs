//! Boundary to the host 3D engine.
//!
//! The core never owns engine objects. It holds [`ObjectHandle`]s issued by
//! the host and asks the host to import, duplicate, rename and transform
//! them through the [`Host`] trait.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::markup::FormatKind;
use crate::placement::HostTransform;

/// Opaque handle to an object in the host's object table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(pub u64);

/// Errors reported by the host engine.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Host import of {path} failed: {message}")]
    Import { path: PathBuf, message: String },

    #[error("Unknown object handle {0:?}")]
    UnknownHandle(ObjectHandle),

    #[error("Host error: {0}")]
    Other(String),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Operations the core needs from the host engine.
pub trait Host {
    /// Import a staged file and return the objects it created.
    fn import(&mut self, kind: FormatKind, path: &Path) -> HostResult<Vec<ObjectHandle>>;

    /// Create lightweight (data-sharing) duplicates of existing objects.
    fn duplicate(&mut self, handles: &[ObjectHandle]) -> HostResult<Vec<ObjectHandle>>;

    fn set_transform(&mut self, handle: ObjectHandle, transform: &HostTransform) -> HostResult<()>;

    fn rename(&mut self, handle: ObjectHandle, name: &str) -> HostResult<()>;
}

/// Where a recorded object came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum ObjectOrigin {
    Imported { kind: FormatKind, path: PathBuf },
    Duplicate { of: ObjectHandle },
}

/// An object held by [`RecordingHost`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedObject {
    pub handle: ObjectHandle,
    pub name: String,
    pub origin: ObjectOrigin,
    pub transform: Option<HostTransform>,
}

/// A host that keeps an object table in memory instead of building geometry.
///
/// Used for dry runs (the CLI writes its table as a manifest) and tests.
/// Imports fail if the staged file does not exist.
#[derive(Debug)]
pub struct RecordingHost {
    objects: Vec<RecordedObject>,
    objects_per_import: usize,
    import_calls: usize,
    duplicate_calls: usize,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            objects_per_import: 1,
            import_calls: 0,
            duplicate_calls: 0,
        }
    }

    /// Make every import produce `count` objects (files holding several meshes).
    pub fn with_objects_per_import(mut self, count: usize) -> Self {
        self.objects_per_import = count;
        self
    }

    pub fn objects(&self) -> &[RecordedObject] {
        &self.objects
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&RecordedObject> {
        self.objects.get(handle.0 as usize)
    }

    pub fn import_calls(&self) -> usize {
        self.import_calls
    }

    pub fn duplicate_calls(&self) -> usize {
        self.duplicate_calls
    }

    fn add(&mut self, name: String, origin: ObjectOrigin) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u64);
        self.objects.push(RecordedObject {
            handle,
            name,
            origin,
            transform: None,
        });
        handle
    }

    fn object_mut(&mut self, handle: ObjectHandle) -> HostResult<&mut RecordedObject> {
        self.objects
            .get_mut(handle.0 as usize)
            .ok_or(HostError::UnknownHandle(handle))
    }
}

impl Host for RecordingHost {
    fn import(&mut self, kind: FormatKind, path: &Path) -> HostResult<Vec<ObjectHandle>> {
        self.import_calls += 1;
        if !path.is_file() {
            return Err(HostError::Import {
                path: path.to_path_buf(),
                message: "file does not exist".to_string(),
            });
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let handles = (0..self.objects_per_import)
            .map(|i| {
                let name = if i == 0 { stem.clone() } else { format!("{}.{:03}", stem, i) };
                self.add(
                    name,
                    ObjectOrigin::Imported {
                        kind,
                        path: path.to_path_buf(),
                    },
                )
            })
            .collect();
        Ok(handles)
    }

    fn duplicate(&mut self, handles: &[ObjectHandle]) -> HostResult<Vec<ObjectHandle>> {
        self.duplicate_calls += 1;
        let mut duplicates = Vec::with_capacity(handles.len());
        for &handle in handles {
            let name = self.object_mut(handle)?.name.clone();
            duplicates.push(self.add(name, ObjectOrigin::Duplicate { of: handle }));
        }
        Ok(duplicates)
    }

    fn set_transform(&mut self, handle: ObjectHandle, transform: &HostTransform) -> HostResult<()> {
        self.object_mut(handle)?.transform = Some(*transform);
        Ok(())
    }

    fn rename(&mut self, handle: ObjectHandle, name: &str) -> HostResult<()> {
        self.object_mut(handle)?.name = name.to_string();
        Ok(())
    }
}
