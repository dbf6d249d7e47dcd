pub mod aggregate;
pub mod classify;
pub mod clean;
pub mod cli;
pub mod dictionary;
pub mod error;
pub mod frame;
pub mod geodatabase;
pub mod io_utils;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod top;
pub mod writer;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("transit_eda", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Parsed command line: {:?}", cli.command);
    match cli.command {
        Commands::Clean(args) => pipeline::execute(&args),
        Commands::Top(args) => top::execute(&args),
        Commands::Columns(args) => dictionary::execute(&args),
        Commands::Profile(args) => profile::execute(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
