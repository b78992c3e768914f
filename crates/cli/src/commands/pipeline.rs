use clap::{Args, Subcommand};
use common::config::loader::{load_config, load_config_from};
use common::config::DuctConfig;
use common::error::DuctError;
use duct_core::functions::{activate_file, compile_file, validate_file, visualize_file};
use log::info;
use shared_clients::{LocalObjectStore, RetryPolicy};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Subcommand)]
pub enum PipelineSubcommand {
    /// Compile a definition and check its activity graph
    Validate(PipelineArgs),
    /// Compile a definition and emit the orchestrator document
    Compile(OutputArgs),
    /// Render the activity graph as DOT
    Visualize(OutputArgs),
    /// Upload staged files and the compiled definition
    Activate(ActivateArgs),
}

#[derive(Debug, Args)]
pub struct PipelineArgs {
    /// Pipeline definition file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Write the result here instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ActivateArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Local directory standing in for the object store
    #[arg(long, value_name = "DIR")]
    pub store_root: PathBuf,
    /// Attempts per upload before giving up
    #[arg(long, default_value_t = 5)]
    pub attempts: u32,
}

pub fn read_config(config_path: Option<&Path>) -> Result<DuctConfig, DuctError> {
    match config_path {
        Some(path) => load_config_from(&[path.to_path_buf()]),
        None => load_config(),
    }
    .map_err(DuctError::init)
}

pub fn handle_pipeline(cmd: &PipelineSubcommand, config: &DuctConfig) -> Result<(), DuctError> {
    match cmd {
        PipelineSubcommand::Validate(args) => {
            let order = validate_file(&args.file, config)?;
            println!("{}", order.join("\n"));
        }
        PipelineSubcommand::Compile(args) => {
            let pipeline = compile_file(&args.file, config)?;
            let json = pipeline.definition_json().map_err(DuctError::compile)?;
            emit(&json, args.output.as_deref())?;
        }
        PipelineSubcommand::Visualize(args) => {
            let dot = visualize_file(&args.file, config, args.output.as_deref())?;
            if args.output.is_none() {
                println!("{dot}");
            }
        }
        PipelineSubcommand::Activate(args) => {
            let mut store = LocalObjectStore::new(&args.store_root);
            let report = activate_file(
                &args.file,
                config,
                &mut store,
                &RetryPolicy::with_attempts(args.attempts),
            )?;
            info!(
                "uploaded {} files, definition at {}",
                report.uploaded.len(),
                report.definition
            );
        }
    }
    Ok(())
}

fn emit(body: &str, output: Option<&Path>) -> Result<(), DuctError> {
    match output {
        Some(path) => {
            fs::write(path, body).map_err(DuctError::compile)?;
            info!("wrote {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}
