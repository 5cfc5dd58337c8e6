pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod io_utils;
pub mod multivalue;
pub mod preview;
pub mod process;
pub mod rows;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::{
    cli::{Cli, Commands},
    config::ScrubConfig,
};

pub use crate::{
    error::ScrubError,
    process::{PipelineState, RowOutcome, ScrubStats, Scrubber},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("trial_scrub", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Scrub(args) => process::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let config = ScrubConfig::from_args(&args.pipeline)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
