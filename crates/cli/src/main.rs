mod commands;

use crate::commands::pipeline::read_config;
use crate::commands::{handle_pipeline, handle_sql, PipelineSubcommand, SqlSubcommand};
use clap::{Parser, Subcommand};
use common::config::components::runtime::LoggingConfig;
use common::error::DuctError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dataduct", about = "Compile YAML ETL pipelines into workflow definitions")]
pub struct Cli {
    #[arg(
        long = "config-path",
        short = 'c',
        help = "config file to use instead of the standard search path",
        global = true
    )]
    pub config_path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Validate, compile, visualize or activate a pipeline definition
    #[command(subcommand)]
    Pipeline(PipelineSubcommand),
    /// Inspect SQL files
    #[command(subcommand)]
    Sql(SqlSubcommand),
}

fn run_cmd(func: Result<(), DuctError>) {
    if let Err(e) = func {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Cmd::Pipeline(cmd) => run_cmd(read_config(cli.config_path.as_deref()).and_then(|config| {
            logging::init_logger(&config.logging);
            handle_pipeline(&cmd, &config)
        })),
        Cmd::Sql(cmd) => {
            logging::init_logger(&LoggingConfig::default());
            run_cmd(handle_sql(&cmd))
        }
    }
}
