//! Outcome of importing one room.

use serde::Serialize;

use crate::host::ObjectHandle;
use crate::placement::HostTransform;
use crate::settings::SceneSettings;

/// One placement that made it into the host.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacedObject {
    pub asset_id: String,
    pub handles: Vec<ObjectHandle>,
    pub transform: HostTransform,
}

/// A placement that was dropped because its asset could not be placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlacementFailure {
    pub asset_id: String,
    pub message: String,
}

/// Everything an import produced, in document order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ImportReport {
    /// Locator of the room document (empty for in-memory imports)
    pub document: String,

    /// Room settings, for the scene configurator
    pub settings: SceneSettings,

    pub placed: Vec<PlacedObject>,

    /// Ids of placements that named no declared asset
    pub skipped: Vec<String>,

    pub failed: Vec<PlacementFailure>,

    /// `<Object>` elements without an id
    pub rejected: usize,
}

impl ImportReport {
    pub fn new(settings: SceneSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Total host objects created, imports and duplicates alike.
    pub fn object_count(&self) -> usize {
        self.placed.iter().map(|p| p.handles.len()).sum()
    }

    /// Placements that failed or were rejected while parsing.
    pub fn failure_count(&self) -> usize {
        self.failed.len() + self.rejected
    }
}
