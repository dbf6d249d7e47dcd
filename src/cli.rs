use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::profile::BuiltinProfile;

#[derive(Debug, Parser)]
#[command(author, version, about = "Clean and aggregate Smart Location Database extracts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean a dataset, add z-score columns, and aggregate by metro area
    Clean(CleanArgs),
    /// Rank metro areas in an aggregate CSV by a metric or a metric disparity
    Top(TopArgs),
    /// Describe known columns, or classify the columns of an input file
    Columns(ColumnsArgs),
    /// Print or save a built-in profile as YAML
    Profile(ProfileArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input .zip archive, CSV/TSV file, or GeoJSON file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory receiving the cleaned and aggregated outputs
    #[arg(short = 'o', long = "output-dir", default_value = "outputs")]
    pub output_dir: PathBuf,
    /// Built-in dataset profile
    #[arg(long, value_enum, default_value = "transit")]
    pub profile: BuiltinProfile,
    /// YAML profile file (overrides --profile)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Layer name to look for inside an archive (overrides the profile)
    #[arg(long)]
    pub layer: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct TopArgs {
    /// Aggregate CSV produced by `clean`
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Metric column to rank by, descending
    #[arg(long, conflicts_with = "disparity", required_unless_present = "disparity")]
    pub metric: Option<String>,
    /// Two metric columns `left,right`; ranks by their absolute difference
    #[arg(long, value_delimiter = ',')]
    pub disparity: Vec<String>,
    /// Number of metro areas to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Optional input whose columns should be classified
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Built-in dataset profile supplying identifiers and the layer name
    #[arg(long, value_enum, default_value = "transit")]
    pub profile: BuiltinProfile,
    /// YAML profile file (overrides --profile)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Built-in profile to export
    #[arg(long, value_enum, default_value = "transit")]
    pub profile: BuiltinProfile,
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
