//! Command-line surface.

use clap::{Parser, Subcommand, ValueEnum};
use healer_export::ExportFormat;
use std::path::PathBuf;

/// Find spiritual healers, enrich their contacts and invite them to Common Soul.
#[derive(Debug, Parser)]
#[command(name = "healer-search", version)]
#[command(about = "Find and contact spiritual healers for the Common Soul platform")]
pub struct Cli {
    /// Path to configuration file (defaults to the platform config directory)
    #[arg(short, long, env = "HEALER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress every email send for this invocation
    #[arg(long)]
    pub dry_run: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run discovery, enrichment, outreach and export
    Run,
    /// Discover and enrich healers without sending anything
    Discover,
    /// Send today's outreach batch
    Outreach,
    /// Export healers to a spreadsheet
    Export {
        /// Output format (defaults to the configured format)
        #[arg(value_enum)]
        format: Option<FormatArg>,
    },
    /// Show store totals and limiter state
    Status,
    /// Move the progressive ramp to week <N>
    Week {
        /// Week number, starting at 1
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        week: u32,
    },
    /// Clear a latched emergency stop
    Resume,
    /// Turn the manual approval gate on or off
    Approval {
        /// `on` holds every send for approval
        #[arg(value_enum)]
        state: Toggle,
    },
}

/// On/off switch for boolean settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    /// Whether the switch is on.
    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Export formats accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Spreadsheet with a summary sheet
    Xlsx,
    /// Delimited text with a summary companion
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => Self::Xlsx,
            FormatArg::Csv => Self::Csv,
        }
    }
}
