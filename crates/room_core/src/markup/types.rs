//! Room markup types for intermediate representation.
//!
//! A tolerant element tree is built first; asset and placement declarations
//! are then read off it before anything is fetched.

use std::fmt;

use room_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::settings::SceneSettings;

/// A parsed markup element. Names and attribute keys are lowercased.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Lowercased tag name
    pub name: String,

    /// Attributes in document order (keys lowercased)
    pub attributes: Vec<(String, String)>,

    /// Child elements
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter (used by tests and synthetic declarations).
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.push((key.to_ascii_lowercase(), value.into()));
        self
    }

    /// Builder-style child setter.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute by (case-insensitive) key. The first occurrence wins.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    /// First descendant (depth-first, document order) with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name.eq_ignore_ascii_case(name) {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given name, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name.eq_ignore_ascii_case(name) {
                found.push(child);
            }
            child.collect(name, found);
        }
    }
}

/// Geometry format of an asset, picked from its source extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    /// Wavefront OBJ with an optional MTL material library
    Mesh,

    /// COLLADA interchange scene (`.dae`)
    Interchange,

    /// glTF (JSON or binary container)
    GlTF,

    /// FBX
    Fbx,
}

impl FormatKind {
    /// Map a source locator to a format (`.obj`, `.dae`, `.gltf`, `.fbx`,
    /// each optionally followed by `.gz`). Case-insensitive.
    pub fn from_source(source: &str) -> Option<Self> {
        let lower = source.to_ascii_lowercase();
        let lower = lower.strip_suffix(".gz").unwrap_or(&lower);
        if lower.ends_with(".obj") {
            Some(FormatKind::Mesh)
        } else if lower.ends_with(".dae") {
            Some(FormatKind::Interchange)
        } else if lower.ends_with(".gltf") {
            Some(FormatKind::GlTF)
        } else if lower.ends_with(".fbx") {
            Some(FormatKind::Fbx)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Mesh => "obj",
            FormatKind::Interchange => "dae",
            FormatKind::GlTF => "gltf",
            FormatKind::Fbx => "fbx",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named reference to a geometry file, possibly with a material graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDeclaration {
    /// Unique key referenced by placements
    pub id: String,

    /// Source locator as written (relative or absolute)
    pub source_locator: String,

    /// Explicit material library (`mtl` attribute)
    pub material_locator: Option<String>,

    /// Geometry format
    pub format_kind: FormatKind,
}

impl AssetDeclaration {
    pub fn new(id: impl Into<String>, source_locator: impl Into<String>, format_kind: FormatKind) -> Self {
        Self {
            id: id.into(),
            source_locator: source_locator.into(),
            material_locator: None,
            format_kind,
        }
    }

    /// Read an `<AssetObject>` element.
    ///
    /// Returns `None` when `id` or `src` is missing or the source extension
    /// is not a recognized geometry format.
    pub fn from_element(element: &Element) -> Option<Self> {
        let id = element.attr("id")?;
        let src = element.attr("src")?;
        let format_kind = FormatKind::from_source(src)?;
        Some(Self {
            id: id.to_string(),
            source_locator: src.to_string(),
            material_locator: element.attr("mtl").map(str::to_string),
            format_kind,
        })
    }

    /// Synthetic glTF declaration for a placement whose id is itself a URL.
    pub fn remote_gltf(url: &str) -> Self {
        Self::new(url, url, FormatKind::GlTF)
    }
}

/// How a placement specifies its orientation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RotationSpec {
    /// Explicit `xdir` / `ydir` / `zdir` axes
    ExplicitAxes { x: Vec3, y: Vec3, z: Vec3 },

    /// `rotation` attribute: Euler degrees in declared order
    EulerDegrees(Vec3),

    /// `fwd` attribute: a single forward direction
    Forward(Vec3),
}

impl Default for RotationSpec {
    fn default() -> Self {
        RotationSpec::Forward(Vec3::Z)
    }
}

/// An instruction to instantiate a declared asset at a transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementDeclaration {
    pub asset_id: String,
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: RotationSpec,
}

impl PlacementDeclaration {
    /// Place `asset_id` at the origin with unit scale and no rotation.
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: RotationSpec::default(),
        }
    }

    /// Read an `<Object>` element. Returns `None` when it has no usable id.
    ///
    /// Rotation precedence: any of `xdir`/`ydir`/`zdir`, then `rotation`,
    /// then `fwd`.
    pub fn from_element(element: &Element) -> Option<Self> {
        let asset_id = element.attr("id").filter(|id| !id.is_empty())?;

        let rotation = if element.has_attr("xdir") || element.has_attr("ydir") || element.has_attr("zdir") {
            RotationSpec::ExplicitAxes {
                x: parse_vec3(element.attr("xdir").unwrap_or("1 0 0")),
                y: parse_vec3(element.attr("ydir").unwrap_or("0 1 0")),
                z: parse_vec3(element.attr("zdir").unwrap_or("0 0 1")),
            }
        } else if let Some(rotation) = element.attr("rotation") {
            RotationSpec::EulerDegrees(parse_vec3(rotation))
        } else {
            RotationSpec::Forward(parse_vec3(element.attr("fwd").unwrap_or("0 0 1")))
        };

        Some(Self {
            asset_id: asset_id.to_string(),
            position: parse_vec3(element.attr("pos").unwrap_or("0 0 0")),
            scale: parse_vec3(element.attr("scale").unwrap_or("1 1 1")),
            rotation,
        })
    }
}

/// Everything read from a room document.
#[derive(Clone, Debug, Default)]
pub struct RoomDocument {
    /// Room-level settings
    pub settings: SceneSettings,

    /// Declared assets followed by the built-in primitives
    pub assets: Vec<AssetDeclaration>,

    /// Object placements in document order
    pub placements: Vec<PlacementDeclaration>,

    /// `<Object>` elements dropped because they had no id
    pub rejected_placements: usize,
}

/// Parse `"x y z"`. Anything that is not three numbers gives the zero vector.
pub fn parse_vec3(text: &str) -> Vec3 {
    let mut parts = text.split_whitespace().map(str::parse::<f32>);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Vec3::new(x, y, z),
        _ => Vec3::ZERO,
    }
}
