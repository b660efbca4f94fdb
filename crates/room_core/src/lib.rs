//! Room Core - Room markup import for a host 3D engine.
//!
//! This crate provides:
//!
//! - **Locators**: resolution of relative, local and remote asset references
//! - **Fetch cache**: content-addressed local copies, with gzip support
//! - **Markup**: a tolerant parser for HTML pages carrying a room
//! - **Assets**: OBJ/MTL, COLLADA, glTF and FBX loaders that stage files and
//!   rewrite their internal references
//! - **Placement**: conversion of placements to host-space transforms
//!
//! # Example
//!
//! ```ignore
//! use room_core::{ImportConfig, Importer, RecordingHost};
//!
//! let importer = Importer::from_config(&ImportConfig::default())?;
//! let mut host = RecordingHost::new();
//! let report = importer.import_document("https://example.org/lobby.html", &mut host)?;
//! println!("Placed {} objects", report.placed.len());
//! ```

pub mod assets;
pub mod cache;
pub mod config;
pub mod host;
pub mod importer;
pub mod locator;
pub mod markup;
pub mod placement;
pub mod scene;
pub mod settings;

// Re-export commonly used types
pub use assets::{AssetError, AssetLoader, AssetRuntimeState};
pub use cache::{DefaultTransport, FetchCache, FetchError, MemoryTransport, Transport};
pub use config::{ImportConfig, PrimitiveCatalog};
pub use host::{Host, HostError, ObjectHandle, RecordingHost};
pub use importer::{ImportError, Importer};
pub use markup::{parse_room, AssetDeclaration, FormatKind, MarkupError, PlacementDeclaration, RoomDocument};
pub use placement::{compute_transform, HostTransform};
pub use scene::ImportReport;
pub use settings::SceneSettings;
