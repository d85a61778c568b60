// crates/cli/src/args.rs
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ssa_report_core::config::{ENV_API_HOST, ENV_API_TOKEN};
use ssa_report_core::SummaryUnitType;

/// Create Species Status Landscape Assessment reports from the command line.
#[derive(Parser, Debug)]
#[command(name = "ssa-report")]
#[command(version)]
#[command(about = "Upload areas of interest and download SSA landscape reports", long_about = None)]
pub struct Cli {
    /// API host, e.g. https://ssa.example.org
    #[arg(long = "api-host", env = ENV_API_HOST, global = true)]
    pub api_host: Option<String>,

    /// API token sent with job submissions
    #[arg(long = "api-token", env = ENV_API_TOKEN, global = true, hide_env_values = true)]
    pub api_token: Option<String>,

    /// Log this client's activity at debug level
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a zipped shapefile or file geodatabase and show what the server found in it
    Upload {
        /// Path to a .zip file
        file: PathBuf,

        /// Name of the area of interest, used in the report title
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a report for a previous upload and download it
    Report {
        /// Upload id returned by `upload`
        #[arg(long)]
        uuid: String,

        /// Comma-separated dataset ids to include
        #[arg(long, value_delimiter = ',', required = true)]
        datasets: Vec<String>,

        /// Leave these datasets out
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Attribute that identifies analysis units
        #[arg(long)]
        field: Option<String>,

        /// Name of the area of interest
        #[arg(long)]
        name: Option<String>,

        /// Where to write the spreadsheet (file or directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create the report for a predefined subwatershed or marine lease block
    Summary {
        /// subwatershed or marine-lease-block
        #[arg(value_parser = parse_unit_type)]
        unit: SummaryUnitType,

        /// Unit id (HUC12 code or lease block id)
        id: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a dataset, create its report, and download it
    Run {
        /// Path to a .zip file
        file: PathBuf,

        /// Attribute that identifies analysis units
        #[arg(long)]
        field: Option<String>,

        /// Only include these datasets (default: every available dataset)
        #[arg(long, value_delimiter = ',')]
        datasets: Vec<String>,

        /// Leave these datasets out
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download a finished report by its result path or URL
    Download {
        /// Result path (/api/reports/results/...) or absolute URL
        result: String,

        /// Area name, used for the default file name
        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_unit_type(raw: &str) -> Result<SummaryUnitType, String> {
    raw.parse().map_err(|e: ssa_report_core::RequestError| e.to_string())
}
