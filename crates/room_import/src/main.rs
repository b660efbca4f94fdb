use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use room_core::host::RecordedObject;
use room_core::{ImportConfig, ImportReport, Importer, RecordingHost};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "room_import")]
#[command(about = "Fetch a room document and its assets, and stage them for a host engine")]
struct Cli {
    /// Room document: an http(s) URL or a local HTML file
    source: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cache directory for fetched and rewritten files
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Directory holding the primitive .obj files
    #[arg(long)]
    primitives_dir: Option<PathBuf>,

    /// Network timeout in seconds (0 waits forever)
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the import report and object table as JSON
    #[arg(long)]
    manifest: Option<PathBuf>,
}

#[derive(Serialize)]
struct Manifest<'a> {
    report: &'a ImportReport,
    objects: &'a [RecordedObject],
}

fn load_config(cli: &Cli) -> Result<ImportConfig> {
    let mut config = match &cli.config {
        Some(path) => ImportConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ImportConfig::default(),
    };

    if let Some(dir) = &cli.working_dir {
        config.working_dir = dir.clone();
    }
    if let Some(dir) = &cli.primitives_dir {
        config.primitives_dir = dir.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = (secs > 0).then_some(secs);
    }
    Ok(config)
}

fn print_summary(report: &ImportReport, host: &RecordingHost) {
    println!("\n=== Room: {} ===", report.document);
    println!("Gravity: {:.2}", report.settings.gravity);
    println!("Placed: {} ({} host objects)", report.placed.len(), host.objects().len());
    println!("Host imports: {}, duplicates: {}", host.import_calls(), host.duplicate_calls());

    if !report.placed.is_empty() {
        println!("\n--- Objects ---");
        for placed in &report.placed {
            let p = placed.transform.position;
            println!(
                "  {} x{} at ({:.2}, {:.2}, {:.2})",
                placed.asset_id,
                placed.handles.len(),
                p.x,
                p.y,
                p.z
            );
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped (no asset): {}", report.skipped.join(", "));
    }
    if report.failure_count() > 0 {
        println!("\n--- Failures ---");
        for failure in &report.failed {
            println!("  {}: {}", failure.asset_id, failure.message);
        }
        if report.rejected > 0 {
            println!("  {} object(s) without an id", report.rejected);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    log::debug!("Using {:?}", config);

    let importer = Importer::from_config(&config)
        .with_context(|| format!("Failed to open working directory {}", config.working_dir.display()))?;

    let mut host = RecordingHost::new();
    let report = importer
        .import_document(&cli.source, &mut host)
        .with_context(|| format!("Failed to import {}", cli.source))?;

    log::debug!("Primitives from {}", importer.primitives().directory_locator());
    print_summary(&report, &host);

    if let Some(path) = &cli.manifest {
        let manifest = Manifest {
            report: &report,
            objects: host.objects(),
        };
        let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(path, json).with_context(|| format!("Failed to write manifest {}", path.display()))?;
        log::info!("Wrote manifest to {}", path.display());
    }

    Ok(())
}
