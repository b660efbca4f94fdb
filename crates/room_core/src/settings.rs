//! Room-level physics and rendering defaults.

use room_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::markup::{parse_vec3, Element};

/// Settings read once from the `<Room>` element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    pub gravity: f32,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub jump_velocity: f32,

    /// Near clip plane distance
    pub near_dist: f32,

    /// Far clip plane distance
    pub far_dist: f32,

    pub teleport_min_dist: f32,
    pub teleport_max_dist: f32,

    pub default_sounds: bool,
    pub cursor_visible: bool,

    pub fog: bool,
    pub fog_density: f32,
    pub fog_start: f32,
    pub fog_end: f32,

    /// Fog color as written (`"r g b"`, 0-255 scale)
    pub fog_col: Vec3,

    pub locked: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            walk_speed: 1.8,
            run_speed: 5.4,
            jump_velocity: 5.0,
            near_dist: 0.0025,
            far_dist: 500.0,
            teleport_min_dist: 5.0,
            teleport_max_dist: 100.0,
            default_sounds: true,
            cursor_visible: true,
            fog: false,
            fog_density: 500.0,
            fog_start: 500.0,
            fog_end: 500.0,
            fog_col: Vec3::new(100.0, 100.0, 100.0),
            locked: false,
        }
    }
}

impl SceneSettings {
    /// Read settings from a `<Room>` element, falling back to defaults.
    ///
    /// Both teleport bounds read the `teleport_min_dist` key; only their
    /// defaults differ.
    pub fn from_room(room: &Element) -> Self {
        let defaults = Self::default();
        Self {
            gravity: float_attr(room, "gravity", defaults.gravity),
            walk_speed: float_attr(room, "walk_speed", defaults.walk_speed),
            run_speed: float_attr(room, "run_speed", defaults.run_speed),
            jump_velocity: float_attr(room, "jump_velocity", defaults.jump_velocity),
            near_dist: float_attr(room, "near_dist", defaults.near_dist),
            far_dist: float_attr(room, "far_dist", defaults.far_dist),
            teleport_min_dist: float_attr(room, "teleport_min_dist", defaults.teleport_min_dist),
            teleport_max_dist: float_attr(room, "teleport_min_dist", defaults.teleport_max_dist),
            default_sounds: bool_attr(room, "default_sounds", defaults.default_sounds),
            cursor_visible: bool_attr(room, "cursor_visible", defaults.cursor_visible),
            fog: bool_attr(room, "fog", defaults.fog),
            fog_density: float_attr(room, "fog_density", defaults.fog_density),
            fog_start: float_attr(room, "fog_start", defaults.fog_start),
            fog_end: float_attr(room, "fog_end", defaults.fog_end),
            fog_col: room.attr("fog_col").map(parse_vec3).unwrap_or(defaults.fog_col),
            locked: bool_attr(room, "locked", defaults.locked),
        }
    }
}

fn float_attr(room: &Element, key: &str, default: f32) -> f32 {
    match room.attr(key) {
        Some(text) => text.trim().parse().unwrap_or_else(|_| {
            log::warn!("Room attribute {}=\"{}\" is not a number, using {}", key, text, default);
            default
        }),
        None => default,
    }
}

// An empty value is false; unknown words count as true.
fn bool_attr(room: &Element, key: &str, default: bool) -> bool {
    match room.attr(key) {
        Some(text) => !matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "0" | "no" | "off"
        ),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_attributes() {
        let settings = SceneSettings::from_room(&Element::new("room"));
        assert_eq!(settings, SceneSettings::default());
        assert_eq!(settings.teleport_min_dist, 5.0);
        assert_eq!(settings.teleport_max_dist, 100.0);
    }

    #[test]
    fn test_attributes_override_defaults() {
        let room = Element::new("room")
            .with_attr("gravity", "-3.5")
            .with_attr("far_dist", "1000")
            .with_attr("fog", "true")
            .with_attr("cursor_visible", "false")
            .with_attr("fog_col", "10 20 30")
            .with_attr("locked", "1");
        let settings = SceneSettings::from_room(&room);
        assert_eq!(settings.gravity, -3.5);
        assert_eq!(settings.far_dist, 1000.0);
        assert!(settings.fog);
        assert!(!settings.cursor_visible);
        assert!(settings.locked);
        assert_eq!(settings.fog_col, Vec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_teleport_bounds_share_a_key() {
        let room = Element::new("room").with_attr("teleport_min_dist", "2");
        let settings = SceneSettings::from_room(&room);
        assert_eq!(settings.teleport_min_dist, 2.0);
        assert_eq!(settings.teleport_max_dist, 2.0);

        let room = Element::new("room").with_attr("teleport_max_dist", "50");
        assert_eq!(SceneSettings::from_room(&room).teleport_max_dist, 100.0);
    }

    #[test]
    fn test_malformed_number_falls_back() {
        let room = Element::new("room").with_attr("walk_speed", "fast");
        assert_eq!(SceneSettings::from_room(&room).walk_speed, 1.8);
    }

    #[test]
    fn test_malformed_fog_col_is_zero() {
        let room = Element::new("room").with_attr("fog_col", "grey");
        assert_eq!(SceneSettings::from_room(&room).fog_col, Vec3::ZERO);
    }
}
