// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Metaform CLI

mod reporter;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use metaform::io::{self, SceneDescription};
use metaform::{analyze, FieldConfig, FieldModel, MarchStatus};
use nalgebra::{Point3, Vector3};
use reporter::Reporter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "metaform")]
#[command(about = "Metaform - metaball field meshing and queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Field configuration file (defaults to ./metaform.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Triangulate a scene and export the mesh
    Mesh {
        /// Scene file (.toml or .json)
        scene: PathBuf,

        /// Output file (.stl or .json)
        #[arg(short, long)]
        output: PathBuf,

        /// Cell size as a fraction of the largest scene extent
        #[arg(short, long)]
        precision: Option<f32>,

        /// Write ASCII instead of binary STL
        #[arg(long)]
        ascii: bool,
    },

    /// Cast a ray into a scene and report the first surface hit
    Probe {
        /// Scene file (.toml or .json)
        scene: PathBuf,

        /// Ray origin as x,y,z
        #[arg(long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
        origin: Vec<f64>,

        /// Ray direction as x,y,z
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        dir: Option<Vec<f64>>,

        /// Also run both closest-point searches from the origin
        #[arg(long)]
        closest: bool,
    },

    /// Report connected components, optionally pruning to one of them
    Islands {
        /// Scene file (.toml or .json)
        scene: PathBuf,

        /// Keep only primitives connected to this one
        #[arg(long, value_name = "INDEX")]
        keep: Option<usize>,

        /// Where to write the pruned scene
        #[arg(short, long, requires = "keep")]
        output: Option<PathBuf>,
    },

    /// Write the default configuration
    Config {
        /// Output file
        #[arg(short, long, default_value = "metaform.toml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        Reporter::report_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Mesh {
            scene,
            output,
            precision,
            ascii,
        } => mesh_command(
            &scene,
            &output,
            precision,
            ascii,
            cli.config.as_deref(),
            cli.verbose,
        ),
        Commands::Probe {
            scene,
            origin,
            dir,
            closest,
        } => probe_command(&scene, &origin, dir.as_deref(), closest, cli.config.as_deref()),
        Commands::Islands {
            scene,
            keep,
            output,
        } => islands_command(
            &scene,
            keep,
            output.as_deref(),
            cli.config.as_deref(),
            cli.verbose,
        ),
        Commands::Config { output } => {
            FieldConfig::default().save(&output)?;
            Reporter::success(&format!("Wrote default configuration to {}", output.display()));
            Ok(())
        }
    }
}

/// Configuration file, else ./metaform.toml with environment overrides
fn base_config(path: Option<&Path>) -> Result<FieldConfig> {
    match path {
        Some(path) => {
            let mut config = FieldConfig::from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => FieldConfig::load(),
    }
}

fn load_model(scene: &Path, config: Option<&Path>) -> Result<FieldModel> {
    let base = base_config(config)?;
    SceneDescription::from_file(scene)?.into_model(base)
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn mesh_command(
    scene: &Path,
    output: &Path,
    precision: Option<f32>,
    ascii: bool,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let model = load_model(scene, config)?;
    let precision = precision.unwrap_or(model.config().precision);
    if verbose {
        Reporter::report_info(&format!(
            "{} primitives, iso {}, precision {}",
            model.len(),
            model.iso(),
            precision
        ));
    }

    let start = Instant::now();
    let pb = spinner(format!("Triangulating {}", scene.display()))?;
    let result = model.triangulize(precision);
    pb.finish_and_clear();
    let result = result.context("Triangulation failed")?;
    let duration = start.elapsed();

    if let MarchStatus::Empty(reason) = result.status {
        bail!("No surface produced ({reason:?})");
    }
    if result.status == MarchStatus::Truncated {
        Reporter::report_warning("Surface was cut off; raise max_cubes or lower the precision");
    }

    if ascii {
        io::export_stl_ascii(&result.mesh, output)?;
    } else {
        io::export(&result.mesh, output)?;
    }

    let stats = analyze(&result.mesh);
    Reporter::report_mesh(
        &scene.display().to_string(),
        &output.display().to_string(),
        result.status,
        &stats,
        duration,
        verbose,
    );
    Ok(())
}

fn parse_vector(values: &[f64], name: &str) -> Result<Vector3<f64>> {
    match values {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => bail!("--{name} takes three comma-separated numbers, got {}", values.len()),
    }
}

fn probe_command(
    scene: &Path,
    origin: &[f64],
    dir: Option<&[f64]>,
    closest: bool,
    config: Option<&Path>,
) -> Result<()> {
    let model = load_model(scene, config)?;
    let origin = Point3::from(parse_vector(origin, "origin")?);

    if let Some(dir) = dir {
        let dir = parse_vector(dir, "dir")?;
        let hit = model.ray_intersection(&origin, &dir, model.config().ray_tolerance)?;
        Reporter::report_probe(hit, hit.map(|p| model.eval(&p)));
    }

    if closest {
        let rays = model.find_closest_surface_point(&origin)?;
        Reporter::report_closest("Closest (rays)", &rays);
        let newton = model.find_closest_surface_point_v2(&origin)?;
        Reporter::report_closest("Closest (gradient)", &newton);
    }
    Ok(())
}

fn islands_command(
    scene: &Path,
    keep: Option<usize>,
    output: Option<&Path>,
    config: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let mut model = load_model(scene, config)?;
    Reporter::report_islands(&model.islands(), verbose);

    let Some(seed) = keep else {
        return Ok(());
    };
    let removed = model.optimize_connection(seed)?;
    model.rebuild();
    Reporter::report_info(&format!(
        "Removed {removed} primitives not connected to #{seed}, {} remain",
        model.len()
    ));

    if let Some(output) = output {
        let text = SceneDescription::from_model(&model).to_toml()?;
        std::fs::write(output, text)
            .with_context(|| format!("Failed to write scene file: {output:?}"))?;
        Reporter::success(&format!("Wrote pruned scene to {}", output.display()));
    }
    Ok(())
}
