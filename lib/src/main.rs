//! Slicer support CLI
//!
//! Usage:
//!   slicer-support info <model.3mf>
//!   slicer-support convert <in.3mf> <out.3mf>
//!   slicer-support supports <layers.json|model.3mf> [--config cfg.json] [--set key=value]...

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use slicer_support::{
    read_tmf_file, write_tmf_file, LayerStack, Print, PrintConfig, PrintObjectConfig, SurfaceType,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Support material generation and 3MF tools
#[derive(Parser, Debug)]
#[command(name = "slicer-support")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the contents of a 3MF file
    Info {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Read a 3MF file and write it back out
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Generate support layers and print a summary table
    Supports {
        /// Layer stack (JSON) or 3MF model
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Object configuration file (JSON)
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Print configuration file (JSON)
        #[arg(long, value_name = "CONFIG")]
        print_config: Option<PathBuf>,

        /// Override a setting, e.g. --set support_material=1
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Write the support layers as JSON
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Number of worker threads (0 = all cores)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Info { input } => cmd_info(&input),
        Commands::Convert { input, output } => cmd_convert(&input, &output),
        Commands::Supports {
            input,
            config,
            print_config,
            set,
            output,
            threads,
        } => cmd_supports(&input, config, print_config, &set, output, threads),
    }
}

fn cmd_info(input: &Path) -> Result<()> {
    let model = read_tmf_file(input)
        .with_context(|| format!("Failed to read 3MF file {}", input.display()))?;

    println!("Model Information:");
    println!("  File: {}", input.display());
    for (name, value) in &model.metadata {
        println!("  {}: {}", name, value);
    }
    println!("  Materials: {}", model.materials.len());
    for (id, material) in &model.materials {
        println!(
            "    [{}] {} {}",
            id,
            material.name().unwrap_or("-"),
            material.display_color().unwrap_or("")
        );
    }
    println!("  Objects: {}", model.objects.len());
    for object in &model.objects {
        println!(
            "    {} ({} volumes, {} triangles, {} instances)",
            if object.name.is_empty() { "<unnamed>" } else { &object.name },
            object.volumes.len(),
            object.facets_count(),
            object.instances.len()
        );
        if let Some(bb) = object.raw_bounding_box() {
            let size = bb.size();
            println!("      Size: {:.3} x {:.3} x {:.3} mm", size[0], size[1], size[2]);
        }
        println!("      Volume: {:.2} mm³", object.mesh().volume());
        for (key, value) in &object.config {
            println!("      {} = {}", key, value);
        }
    }
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path) -> Result<()> {
    let model = read_tmf_file(input)
        .with_context(|| format!("Failed to read 3MF file {}", input.display()))?;
    write_tmf_file(&model, output)
        .with_context(|| format!("Failed to write 3MF file {}", output.display()))?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// Apply a `key=value` override to whichever configuration owns the key.
fn apply_setting(print: &mut Print, setting: &str) -> Result<()> {
    let Some((key, value)) = setting.split_once('=') else {
        bail!("Invalid setting '{}', expected KEY=VALUE", setting);
    };
    let (key, value) = (key.trim(), value.trim());
    if PrintObjectConfig::has(key) {
        print.default_object_config.set_deserialize(key, value)?;
    } else if PrintConfig::has(key) {
        print.config.set_deserialize(key, value)?;
    } else {
        bail!("Unknown setting '{}'", key);
    }
    Ok(())
}

fn cmd_supports(
    input: &Path,
    config_file: Option<PathBuf>,
    print_config_file: Option<PathBuf>,
    settings: &[String],
    output: Option<PathBuf>,
    threads: usize,
) -> Result<()> {
    // Set thread count if specified
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to initialize thread pool")?;
    }

    let mut print = Print::new();
    if let Some(path) = &print_config_file {
        print.config = PrintConfig::from_json_file(path)
            .with_context(|| format!("Failed to load print config {}", path.display()))?;
    }
    if let Some(path) = &config_file {
        print.default_object_config = PrintObjectConfig::from_json_file(path)
            .with_context(|| format!("Failed to load object config {}", path.display()))?;
    }
    for setting in settings {
        apply_setting(&mut print, setting)?;
    }
    print.config.validate()?;
    print.default_object_config.validate()?;
    info!("Print config: {}", print.config);
    info!("Object config: {}", print.default_object_config);

    let is_tmf = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("3mf"));
    if is_tmf {
        let model = read_tmf_file(input)
            .with_context(|| format!("Failed to read 3MF file {}", input.display()))?;
        for object in &model.objects {
            print
                .add_model_object(object)
                .with_context(|| format!("Failed to add object '{}'", object.name))?;
        }
    } else {
        let stack = LayerStack::from_json_file(input)
            .with_context(|| format!("Failed to load layer stack {}", input.display()))?;
        print.add_object(Box::new(stack));
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Generating support material...");
    let result = print.generate_support_material();
    spinner.finish_and_clear();
    result.context("Support generation failed")?;

    for (idx, object) in print.objects().iter().enumerate() {
        println!(
            "Object {}: {} layers, {} support layers",
            idx,
            object.layer_count(),
            object.support_layer_count()
        );
        if object.support_layer_count() == 0 {
            continue;
        }
        println!(
            "  {:>4} {:>8} {:>7} {:>5} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "id", "z", "height", "raft", "base", "interface", "pillar", "contact", "length"
        );
        for layer in object.support_layers() {
            let area = |t: SurfaceType| -> f64 {
                layer.regions_of_type(t).iter().map(|e| e.area_mm2()).sum()
            };
            let contact: f64 = layer.contact.iter().map(|e| e.area_mm2()).sum();
            println!(
                "  {:>4} {:>8.3} {:>7.3} {:>5} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.1}",
                layer.id,
                layer.print_z,
                layer.height,
                if layer.is_raft { "yes" } else { "" },
                area(SurfaceType::SupportBase),
                area(SurfaceType::SupportInterface),
                area(SurfaceType::SupportPillar),
                contact,
                layer.extrusion_length()
            );
        }
    }

    if let Some(path) = output {
        let layers: Vec<_> = print.objects().iter().map(|o| o.support_layers()).collect();
        let json = serde_json::to_string_pretty(&layers).context("Failed to serialize layers")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Support layers written to {}", path.display());
    }

    Ok(())
}
