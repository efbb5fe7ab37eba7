//! Global CLI options shared across all commands

use crate::cli::{Cli, OutputFormat};

/// Global flags, collected once in `main.rs` and passed to every handler.
///
/// Precedence is CLI flag, then environment variable, then config file,
/// then default. This struct captures the first two; the rest is resolved
/// in `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.catatkeu/config.yaml)
    pub config: Option<String>,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }
}
