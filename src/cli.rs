use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Scrub clinical-trial registry exports into analysis-ready CSV",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Drop columns and rows, split study designs, and derive methods and duration
    Scrub(ScrubArgs),
    /// Scrub the first few rows and display them in a formatted table
    Preview(PreviewArgs),
    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

/// Settings shared by every command that runs the pipeline.
#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// YAML configuration file (drop_columns, study_type, progress_interval)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Replace the configured drop list with this comma-separated list of columns
    #[arg(long = "drop-columns", value_delimiter = ',', conflicts_with = "keep_all_columns")]
    pub drop_columns: Option<Vec<String>>,
    /// Keep every raw column
    #[arg(long = "keep-all-columns")]
    pub keep_all_columns: bool,
    /// Study type to retain (defaults to Interventional)
    #[arg(long = "study-type")]
    pub study_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct ScrubArgs {
    /// Input CSV file with the raw registry export ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
    /// CSV delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Replace undecodable input bytes instead of failing
    #[arg(long = "lossy-input")]
    pub lossy_input: bool,
    /// Write the run report as JSON to this path
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input CSV file to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of scrubbed rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Restrict the table to this comma-separated list of output columns
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Replace undecodable input bytes instead of failing
    #[arg(long = "lossy-input")]
    pub lossy_input: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_single_chars() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn drop_columns_split_on_commas() {
        let cli = Cli::parse_from([
            "trial-scrub",
            "scrub",
            "-i",
            "in.csv",
            "--drop-columns",
            "Rank,URL",
        ]);
        let Commands::Scrub(args) = cli.command else {
            panic!("expected scrub command");
        };
        assert_eq!(
            args.pipeline.drop_columns,
            Some(vec!["Rank".to_string(), "URL".to_string()])
        );
    }

    #[test]
    fn keep_all_conflicts_with_drop_list() {
        let parsed = Cli::try_parse_from([
            "trial-scrub",
            "scrub",
            "-i",
            "in.csv",
            "--drop-columns",
            "Rank",
            "--keep-all-columns",
        ]);
        assert!(parsed.is_err());
    }
}
