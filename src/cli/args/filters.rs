//! Filter argument types for CLI commands

use chrono::NaiveDate;
use clap::Args;

use crate::client::RecordFilter;

/// Filter arguments for `records list`.
///
/// `--month` takes precedence over `--from`/`--to`.
#[derive(Args, Debug, Default, Clone)]
pub struct RecordFilterArgs {
    /// Only records in this month (YYYY-MM)
    #[arg(long, short = 'm', value_parser = parse_month)]
    pub month: Option<String>,

    /// Records on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Records on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// Maximum records to show
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

impl RecordFilterArgs {
    pub fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            month: self.month.clone(),
            from: self.from,
            to: self.to,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

fn parse_month(value: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m").to_string())
        .map_err(|_| format!("invalid month '{}', expected YYYY-MM", value))
}
