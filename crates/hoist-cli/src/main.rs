mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hoist_core::session::{DependencySpec, Manifest, ResolutionCache, UnitSpec};
use hoist_core::{
    print_program, DefaultInterop, Lowerer, LoweringConfig, LoweringReport, Program,
    CONFIG_FILE_NAME,
};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "hoist")]
#[command(about = "Companion and singleton field lowering", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lower program documents and print the result
    Lower {
        /// Documents or directories to lower (*.yaml, *.yml, *.json)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        options: LowerOptions,
    },

    /// Lower the units of a session manifest in dependency order
    Session {
        /// Session manifest
        manifest: PathBuf,

        /// Lower only this unit (`name` or `name@version`) and the units it
        /// depends on
        #[arg(long)]
        unit: Option<String>,

        #[command(flatten)]
        options: LowerOptions,
    },
}

#[derive(clap::Args, Debug)]
struct LowerOptions {
    /// Configuration file (defaults to hoist.yaml next to the inputs)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip IR verification after lowering
    #[arg(long)]
    no_verify: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Lower programs one at a time
    #[arg(long)]
    sequential: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Printed IR
    Text,
    /// Lowering reports
    Json,
}

fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Lower { inputs, options } => run_lower(&inputs, &options),
        Command::Session {
            manifest,
            unit,
            options,
        } => run_session(&manifest, unit.as_deref(), &options),
    }
}

fn load_config(options: &LowerOptions, base: &Path) -> Result<LoweringConfig> {
    let mut config = match &options.config {
        Some(path) => LoweringConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let candidate = base.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "using config");
                LoweringConfig::load(&candidate)?
            } else {
                LoweringConfig::default()
            }
        }
    };
    if options.no_verify {
        config.verify = false;
    }
    if options.sequential {
        config.parallel = false;
    }
    Ok(config)
}

/// Expands directories into the documents they contain, sorted by path.
/// Configuration files are skipped.
fn collect_documents(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| is_document(path))
                .collect();
            found.sort();
            documents.extend(found);
        } else if input.is_file() {
            documents.push(input.clone());
        } else {
            bail!("input not found: {}", input.display());
        }
    }
    if documents.is_empty() {
        bail!("no documents found");
    }
    Ok(documents)
}

fn is_document(path: &Path) -> bool {
    let is_config = path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME);
    let extension = path.extension().and_then(|e| e.to_str());
    !is_config && matches!(extension, Some("yaml" | "yml" | "json"))
}

fn load_programs(paths: &[PathBuf], parallel: bool) -> Result<Vec<Program>> {
    let load = |path: &PathBuf| {
        Program::load(path).with_context(|| format!("failed to load {}", path.display()))
    };
    if parallel {
        paths.par_iter().map(load).collect()
    } else {
        paths.iter().map(load).collect()
    }
}

fn lower_programs(programs: &mut [Program], config: &LoweringConfig) -> Result<Vec<LoweringReport>> {
    let interop = DefaultInterop::new(config);
    let reports = Lowerer::new(config, &interop).lower_all(programs)?;
    Ok(reports)
}

fn run_lower(inputs: &[PathBuf], options: &LowerOptions) -> Result<()> {
    let base = match inputs.first() {
        Some(first) if first.is_dir() => first.clone(),
        Some(first) => first.parent().map(Path::to_path_buf).unwrap_or_default(),
        None => PathBuf::new(),
    };
    let config = load_config(options, &base)?;
    let paths = collect_documents(inputs)?;
    info!(documents = paths.len(), "lowering");

    let mut programs = load_programs(&paths, config.parallel)?;
    let reports = lower_programs(&mut programs, &config)?;

    match options.format {
        OutputFormat::Text => {
            for program in &programs {
                print!("{}", print_program(program));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct UnitOutput<'a> {
    unit: String,
    dependencies: Vec<DependencySpec>,
    reports: &'a [LoweringReport],
}

fn run_session(manifest_path: &Path, unit: Option<&str>, options: &LowerOptions) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let config = load_config(options, &manifest.root)?;
    let mut cache = ResolutionCache::new();

    let order = manifest.build_order()?;
    let selected: Vec<&UnitSpec> = match unit {
        Some(target) => {
            let target = manifest.find_target(target)?;
            let merged = manifest.merged_dependencies(target, &mut cache)?;
            order
                .into_iter()
                .filter(|u| *u == target || depends_on(&merged, u))
                .collect()
        }
        None => order,
    };

    let mut outputs = Vec::with_capacity(selected.len());
    for unit in selected {
        let dependencies = manifest.merged_dependencies(unit, &mut cache)?;
        let paths = manifest.source_paths(unit);
        let mut programs = load_programs(&paths, config.parallel)?;
        let reports = lower_programs(&mut programs, &config)
            .with_context(|| format!("failed to lower unit {}", unit.id()))?;
        info!(unit = %unit.id(), programs = programs.len(), "unit lowered");
        outputs.push((unit, dependencies, programs, reports));
    }

    match options.format {
        OutputFormat::Text => {
            for (unit, dependencies, programs, _) in &outputs {
                let deps: Vec<String> = dependencies.iter().map(describe_dependency).collect();
                println!("unit {}", unit.id());
                if !deps.is_empty() {
                    println!("depends on {}", deps.join(", "));
                }
                for program in programs {
                    print!("{}", print_program(program));
                }
            }
        }
        OutputFormat::Json => {
            let json: Vec<UnitOutput<'_>> = outputs
                .iter()
                .map(|(unit, dependencies, _, reports)| UnitOutput {
                    unit: unit.id(),
                    dependencies: dependencies.clone(),
                    reports,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

/// Whether `unit` is among the merged dependencies of the target.
fn depends_on(merged: &[DependencySpec], unit: &UnitSpec) -> bool {
    merged.iter().any(|d| {
        d.name == unit.name && d.version.as_ref().map_or(true, |v| *v == unit.version)
    })
}

fn describe_dependency(dependency: &DependencySpec) -> String {
    match &dependency.version {
        Some(version) => format!("{}@{}", dependency.name, version),
        None => dependency.name.clone(),
    }
}
