//! assy - compose a CAD assembly from a part manifest
//!
//! Places every part by its transform or anchor mate and writes a combined
//! STEP file (plus optional GLB and STL).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use assy_core::{Assembly, DEFAULT_STEP_FILE, ExportOptions, FileLoader, Manifest, resolve};

#[derive(Parser)]
#[command(name = "assy", version)]
#[command(about = "Place parts by anchor mates and export a combined assembly", long_about = None)]
struct Cli {
    /// Manifest file (.json, .ron or .toml)
    manifest: PathBuf,

    /// STEP output path (relative paths land in the manifest's out_dir)
    #[arg(long, default_value = DEFAULT_STEP_FILE)]
    out: PathBuf,

    /// Also write a GLB for visual inspection
    #[arg(long)]
    outglb: Option<PathBuf>,

    /// Also write a merged STL
    #[arg(long)]
    outstl: Option<PathBuf>,

    /// Validate and resolve placements without loading geometry
    #[arg(long)]
    check: bool,
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assy_cli=info,assy_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let manifest = Manifest::load(&cli.manifest)
        .with_context(|| format!("Failed to read manifest {:?}", cli.manifest))?;

    if cli.check {
        return check(&manifest);
    }

    let loader = FileLoader::new(&manifest.out_dir);
    let assembly = Assembly::build(&manifest, &loader)
        .with_context(|| format!("Failed to build assembly '{}'", manifest.name))?;

    let mut options = ExportOptions::new(&manifest.out_dir).with_step(&cli.out);
    if let Some(path) = cli.outglb {
        options = options.with_glb(path);
    }
    if let Some(path) = cli.outstl {
        options = options.with_stl(path);
    }

    let report = assembly.export(&options).context("Export failed")?;
    for (format, path) in &report.written {
        println!("Wrote {}: {}", format.name(), path.display());
    }

    Ok(())
}

/// Print every resolved placement, in dependency order
fn check(manifest: &Manifest) -> Result<()> {
    let resolution = resolve(manifest.parts()).context("Placement failed")?;

    println!(
        "{}: {} parts placed ({})",
        manifest.name,
        resolution.len(),
        manifest.units
    );
    for name in resolution.resolution_order() {
        let Some(transform) = resolution.get(name) else {
            continue;
        };
        let t = transform.translation;
        let r = transform.rotation_degrees();
        let mated = manifest
            .part(name)
            .and_then(|p| p.mate())
            .map(|m| format!("  mated {} -> {}.{}", m.my_anchor, m.to_part, m.to_anchor))
            .unwrap_or_default();
        println!(
            "  {name}: t=[{:.4}, {:.4}, {:.4}] r_deg=[{:.3}, {:.3}, {:.3}] s={}{mated}",
            t.x, t.y, t.z, r.x, r.y, r.z, transform.scale
        );
    }

    Ok(())
}
