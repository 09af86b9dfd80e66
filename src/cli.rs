// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use crate::config::loader::default_project_path;

/// Command-line arguments for `princess`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "princess",
    version,
    about = "Preview and apply dependency-aware stage reschedules.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (TOML).
    ///
    /// Default: `Princess.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_project_path())]
    pub project: PathBuf,

    /// Stage to move. Without it, only the critical path is printed.
    #[arg(long, value_name = "ID")]
    pub stage: Option<String>,

    /// New start date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// New end date (YYYY-MM-DD).
    ///
    /// If omitted, the stage keeps its current duration.
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Write the move back to the project file if it is applicable.
    #[arg(long)]
    pub commit: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PRINCESS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print stages and critical path, then exit.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_flags_parse_iso_dates() {
        let args = CliArgs::try_parse_from([
            "princess",
            "--stage",
            "audit",
            "--start",
            "2026-03-09",
            "--commit",
        ])
        .unwrap();

        assert_eq!(args.project, default_project_path());
        assert_eq!(args.stage.as_deref(), Some("audit"));
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2026, 3, 9));
        assert!(args.end.is_none());
        assert!(args.commit);
    }

    #[test]
    fn bad_date_is_a_parse_error() {
        assert!(CliArgs::try_parse_from(["princess", "--start", "next week"]).is_err());
    }
}
