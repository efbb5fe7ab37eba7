//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod auth;
pub mod completions;
pub mod context;
pub mod intake;
pub mod records;
pub mod status;
pub mod upload;
pub mod watch;

pub use args::{GlobalOptions, OutputFormat, RecordFilterArgs};

/// catatkeu - command-line companion for Catatan Keuangan
#[derive(Parser, Debug)]
#[command(name = "catatkeu")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "CATATKEU_FORMAT",
        default_value = "table",
        hide_env = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "CATATKEU_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "CATATKEU_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and start a session
    Login {
        /// Account username (prompted when omitted)
        #[arg(long, short = 'u', env = "CATATKEU_USERNAME", hide_env = true)]
        username: Option<String>,

        /// Account password (prompted when omitted)
        #[arg(long, env = "CATATKEU_PASSWORD", hide_env = true)]
        password: Option<String>,

        /// Keep the session on disk for later commands
        #[arg(long, short = 'r')]
        remember: bool,
    },

    /// End the session and forget stored credentials
    Logout,

    /// Show session and configuration status
    Status,

    /// Browse income records
    #[command(subcommand)]
    Records(RecordsCommands),

    /// Upload a receipt to the backend for OCR
    Upload {
        /// Image file to upload
        file: PathBuf,

        /// Storage folder on the server
        #[arg(long)]
        folder: Option<String>,

        /// Amount to record, overriding OCR
        #[arg(long)]
        amount: Option<f64>,

        /// Finalize the upload once it is stored
        #[arg(long)]
        submit: bool,
    },

    /// Run receipts through the local intake pipeline
    Intake {
        /// Receipt files, processed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Owning profile identity
        #[arg(long)]
        profile_id: Option<u64>,

        /// Storage folder
        #[arg(long)]
        folder: Option<String>,

        /// Keep stored files and the intake ledger in this directory
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Wait for the current session to expire, then log out
    Watch,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Record subcommands
#[derive(Subcommand, Debug)]
pub enum RecordsCommands {
    /// List records, most recent first
    List(RecordFilterArgs),

    /// Show one record
    Get {
        /// Record ID
        id: String,
    },

    /// Show the sum of all records
    Total,

    /// Show revenue per month
    Revenue,

    /// Show total, monthly revenue and latest records together
    Summary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_records_list_filters() {
        let cli = Cli::parse_from(["catatkeu", "records", "list", "--month", "2025-08", "-n", "3"]);
        match cli.command {
            Commands::Records(RecordsCommands::List(args)) => {
                assert_eq!(args.month.as_deref(), Some("2025-08"));
                assert_eq!(args.limit, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_intake() {
        let cli = Cli::parse_from([
            "catatkeu",
            "intake",
            "a.jpg",
            "b.png",
            "--profile-id",
            "7",
        ]);
        match cli.command {
            Commands::Intake {
                files, profile_id, ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(profile_id, Some(7));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_intake_requires_files() {
        assert!(Cli::try_parse_from(["catatkeu", "intake"]).is_err());
    }
}
