use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use sbgnml_rs::{CodecConfig, Diagnostic, Map, ReadOptions, Registry, ReturnType};

#[derive(Parser)]
#[command(author, version, about = "Convert and inspect SBGN-ML maps", long_about = None)]
struct Cli {
    /// Log at debug level when RUST_LOG is not set.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a map and write it back in the given format.
    #[command(name = "convert_sbgnml")]
    ConvertSbgnml {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "sbgnml-0.3")]
        format: String,
        /// Horizontal margin around the map when the input has no map bbox.
        #[arg(long)]
        xsep: Option<f64>,
        #[arg(long)]
        ysep: Option<f64>,
        /// Neither read nor write render information.
        #[arg(long)]
        no_styles: bool,
        /// TOML file with `[read]` and `[write]` options. Flags win over it.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the dialect and the size of each part of a map.
    #[command(name = "inspect_sbgnml")]
    InspectSbgnml {
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let registry = Registry::with_defaults();
    match cli.command {
        Command::ConvertSbgnml {
            input,
            output,
            format,
            xsep,
            ysep,
            no_styles,
            config,
        } => {
            let mut config = match config {
                Some(path) => CodecConfig::load(&path)
                    .with_context(|| format!("Failed to load configuration {:?}", path))?,
                None => CodecConfig::default(),
            };
            config.read.return_type = ReturnType::Map;
            if let Some(xsep) = xsep {
                config.read.xsep = xsep;
            }
            if let Some(ysep) = ysep {
                config.read.ysep = ysep;
            }
            if no_styles {
                config.read.with_styles = false;
                config.write.with_styles = false;
            }
            convert_sbgnml(&registry, &input, &output, &format, &config)
        }
        Command::InspectSbgnml { input } => inspect_sbgnml(&registry, &input),
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("warning: {diagnostic}");
    }
}

fn read_map(registry: &Registry, input: &Path, options: &ReadOptions) -> Result<Map> {
    let result = registry
        .read(input, None, options)
        .with_context(|| format!("Failed to read {:?}", input))?;
    print_diagnostics(&result.diagnostics);
    result
        .object
        .into_map()
        .with_context(|| format!("Reading {:?} produced no map", input))
}

fn convert_sbgnml(registry: &Registry, input: &Path, output: &Path, format: &str, config: &CodecConfig) -> Result<()> {
    let map = read_map(registry, input, &config.read)?;
    let report = registry
        .write(&map, output, format, &config.write)
        .with_context(|| format!("Failed to write {:?} as {format}", output))?;
    print_diagnostics(&report.diagnostics);
    info!(
        input = input.display().to_string(),
        output = output.display().to_string(),
        skipped = report.diagnostics.len();
        "Converted map"
    );
    Ok(())
}

fn inspect_sbgnml(registry: &Registry, input: &Path) -> Result<()> {
    let map = read_map(registry, input, &ReadOptions::default())?;
    println!("map {} ({:?})", map.id(), map.dialect());
    if let Some(model) = map.model() {
        println!("model: {} elements", model.len());
        println!("  compartments: {}", model.compartments().len());
        println!("  entity pools: {}", model.entity_pools().len());
        println!("  activities: {}", model.activities().len());
        println!("  processes: {}", model.processes().len());
        println!("  logical operators: {}", model.logical_operators().len());
        println!("  modulations: {}", model.modulations().len());
        println!("  submaps: {}", model.submaps().len());
        println!("  tags: {}", model.tags().len());
    }
    if let Some(layout) = map.layout() {
        let bbox = layout.bbox();
        println!(
            "layout: {} top-level, {} total, bbox {}x{} at ({}, {})",
            layout.layout_elements().len(),
            layout.descendants().len(),
            bbox.w,
            bbox.h,
            bbox.x,
            bbox.y
        );
    }
    if let Some(mapping) = map.mapping() {
        println!("mapping: {} layout elements", mapping.len());
    }
    println!("annotated: {}, with notes: {}", map.annotations().len(), map.notes().len());
    Ok(())
}
