//! Output format selected with `--format` or `CATATKEU_FORMAT`

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Rounded tables with rupiah amounts and Indonesian dates
    #[default]
    Table,
    /// Pretty JSON inside a `data`/`meta` envelope
    Json,
}
