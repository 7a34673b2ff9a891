//! Command-line argument parsing for Vantage.

use crate::config::Config;
use crate::error::{Result, VantageError};
use crate::gateway::ParameterBindings;
use clap::Parser;
use std::path::PathBuf;

/// Output format for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text preview of one result page.
    #[default]
    Text,
    /// JSON snapshot with metadata envelope.
    Json,
    /// CSV export (flattened join when child records are present).
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: text, json, or csv"
            )),
        }
    }
}

/// A headless runner for saved relational queries with run-as access
/// verification.
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Name of the query configuration to run
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Run the query as another user and verify the outcome
    #[arg(long, value_name = "USER")]
    pub run_as: Option<String>,

    /// Parameter binding as key=value (repeatable, overrides predefined)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Parameter bindings as a JSON object
    #[arg(long, value_name = "JSON")]
    pub bindings_json: Option<String>,

    /// Ad hoc query text overriding the configuration's query
    #[arg(long, value_name = "TEXT")]
    pub query_override: Option<String>,

    /// Preview page to show (1-based, clamped)
    #[arg(long, value_name = "N", default_value = "1")]
    pub page: usize,

    /// Records per preview page (defaults to the config value)
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Record key to expand in the preview (repeatable)
    #[arg(long, value_name = "KEY")]
    pub expand: Vec<String>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: String,

    /// Write output to file instead of stdout
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// List configured queries and exit
    #[arg(long)]
    pub list: bool,

    /// Use the in-memory mock gateway (for demos and testing)
    #[arg(long)]
    pub mock_gateway: bool,

    /// Roster key of the calling user (overrides config)
    #[arg(long, value_name = "USER")]
    pub caller: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to a file instead of stderr
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, CLI flag winning over the default.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Parses the `--format` flag.
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format.parse().map_err(VantageError::validation)
    }

    /// Builds the request-side bindings from `--bindings-json` and `--param`
    /// flags, with `--param` winning on key collisions.
    pub fn request_bindings(&self) -> Result<ParameterBindings> {
        let mut bindings = match &self.bindings_json {
            Some(json) => ParameterBindings::parse(json)?,
            None => ParameterBindings::default(),
        };

        for param in &self.params {
            let (key, raw) = param.split_once('=').ok_or_else(|| {
                VantageError::validation(format!("Invalid --param '{param}'. Expected KEY=VALUE"))
            })?;
            // Bare words bind as strings, JSON scalars as themselves
            let value = match serde_json::from_str(raw) {
                Ok(value) => value,
                Err(_) => serde_json::Value::String(raw.to_string()),
            };
            bindings.insert(key, value)?;
        }

        Ok(bindings)
    }
}
