//! Room markup support.
//!
//! This module parses room documents (HTML pages carrying a `<FireBoxRoom>`
//! scene container) into scene settings, asset declarations and object
//! placements.
//!
//! ## Supported Elements
//!
//! - `<Room>` attributes: gravity, walk/run speed, jump velocity, clip
//!   planes, teleport bounds, sound/cursor flags, fog, lock flag
//! - `<AssetObject>` with `.obj`, `.dae`, `.gltf`, `.fbx` sources (optionally gzipped)
//! - `<Object>` placements with `pos`, `scale` and one of
//!   `xdir`/`ydir`/`zdir`, `rotation` or `fwd`
//!
//! ## Not Supported
//!
//! - Schema validation
//! - Non-geometry assets (images, sounds, videos, scripts)
//! - Text, links, lights and other non-`<Object>` room content
//!
//! # Example
//!
//! ```ignore
//! use room_core::config::ImportConfig;
//! use room_core::markup::parse_room;
//!
//! let catalog = ImportConfig::default().primitive_catalog();
//! let room = parse_room(page.as_bytes(), &catalog)?;
//! println!("{} objects", room.placements.len());
//! ```

mod parser;
mod types;

pub use parser::*;
pub use types::*;
