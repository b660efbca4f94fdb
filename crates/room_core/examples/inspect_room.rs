//! Example: Parse a room document and print what it declares.
//!
//! Run with: cargo run --example inspect_room -- rooms/lobby.html

use std::env;
use std::fs;

use room_core::config::ImportConfig;
use room_core::markup::{parse_room, RotationSpec};
use room_core::placement::compute_transform;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_room <path-to-room-html>");
        println!("\nExamples:");
        println!("  cargo run --example inspect_room -- rooms/lobby.html");
        return;
    }

    let path = &args[1];
    println!("Reading room document: {}", path);

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            return;
        }
    };

    let catalog = ImportConfig::default().primitive_catalog();
    match parse_room(&bytes, &catalog) {
        Ok(room) => {
            let settings = &room.settings;
            println!("\n=== Room ===");
            println!("Gravity: {:.2}", settings.gravity);
            println!("Walk / run speed: {:.2} / {:.2}", settings.walk_speed, settings.run_speed);
            println!("Clip: {} to {}", settings.near_dist, settings.far_dist);
            if settings.fog {
                println!(
                    "Fog: density {:.2}, color ({:.0}, {:.0}, {:.0})",
                    settings.fog_density, settings.fog_col.x, settings.fog_col.y, settings.fog_col.z
                );
            }

            println!("\n--- Assets ---");
            for asset in room.assets.iter().filter(|a| !catalog.contains(&a.id)) {
                println!("  [{}] {} ({})", asset.id, asset.source_locator, asset.format_kind);
                if let Some(mtl) = &asset.material_locator {
                    println!("       Material: {}", mtl);
                }
            }
            println!("  + {} built-in primitives", catalog.declarations().len());

            println!("\n--- Objects ---");
            for (i, placement) in room.placements.iter().enumerate() {
                let transform = compute_transform(placement);
                let orientation = match placement.rotation {
                    RotationSpec::ExplicitAxes { .. } => "axes",
                    RotationSpec::EulerDegrees(_) => "rotation",
                    RotationSpec::Forward(_) => "fwd",
                };
                println!(
                    "  [{}] {} at ({:.2}, {:.2}, {:.2}), euler ({:.3}, {:.3}, {:.3}) from {}",
                    i,
                    placement.asset_id,
                    transform.position.x,
                    transform.position.y,
                    transform.position.z,
                    transform.rotation_euler.x,
                    transform.rotation_euler.y,
                    transform.rotation_euler.z,
                    orientation
                );
            }
            if room.rejected_placements > 0 {
                println!("\n{} object(s) without an id were skipped", room.rejected_placements);
            }
        }
        Err(e) => {
            eprintln!("Error parsing room: {}", e);
        }
    }
}
