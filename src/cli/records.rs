//! Record browsing commands

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::args::{GlobalOptions, RecordFilterArgs};
use crate::cli::context::CommandContext;
use crate::cli::OutputFormat;
use crate::client::models::{sort_most_recent_first, total_amount};
use crate::client::{Catatan, RecordsApi, RevenuePerMonth};
use crate::error::Result;
use crate::output::formatters::{format_date_indo, format_idr, format_month, format_rupiah};
use crate::output::{json, table};

/// Records shown by `records summary`
const SUMMARY_LATEST: usize = 5;

/// Display format for records in table view
#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "NO")]
    no: usize,

    #[tabled(rename = "TANGGAL")]
    date: String,

    #[tabled(rename = "KATEGORI")]
    category: String,

    #[tabled(rename = "NOMINAL")]
    amount: String,
}

impl RecordRow {
    fn new(no: usize, record: &Catatan) -> Self {
        Self {
            no,
            date: format_date_indo(record.date),
            category: record.category.clone().unwrap_or_else(|| "-".to_string()),
            amount: format_rupiah(record.amount),
        }
    }
}

fn record_rows(records: &[Catatan]) -> Vec<RecordRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| RecordRow::new(i + 1, r))
        .collect()
}

#[derive(Tabled)]
struct RevenueRow {
    #[tabled(rename = "BULAN")]
    month: String,

    #[tabled(rename = "TOTAL")]
    total: String,
}

impl From<&RevenuePerMonth> for RevenueRow {
    fn from(rev: &RevenuePerMonth) -> Self {
        Self {
            month: format_month(&rev.month),
            total: format_rupiah(rev.total),
        }
    }
}

#[derive(Serialize)]
struct TotalOutput {
    total: f64,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    total: f64,
    revenue: &'a [RevenuePerMonth],
    latest: &'a [Catatan],
}

/// Run the records list command
pub async fn list(opts: &GlobalOptions, args: &RecordFilterArgs) -> Result<()> {
    let ctx = CommandContext::authenticated(opts).await?;

    let mut records = args.to_filter().apply(ctx.client.list_records().await?);
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }

    match ctx.format {
        OutputFormat::Table => {
            println!("{}", table::format_table(&record_rows(&records)));
            if !records.is_empty() {
                println!(
                    "{} {}",
                    "Total:".bold(),
                    format_rupiah(total_amount(&records))
                );
            }
        }
        OutputFormat::Json => println!("{}", json::format_json(&records)?),
    }
    Ok(())
}

/// Run the records get command
pub async fn get(opts: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = CommandContext::authenticated(opts).await?;
    let record = ctx.client.get_record(id).await?;

    match ctx.format {
        OutputFormat::Table => {
            let fields = [
                ("ID", record.id.clone()),
                ("Tanggal", format_date_indo(record.date)),
                (
                    "Kategori",
                    record.category.clone().unwrap_or_else(|| "-".to_string()),
                ),
                ("Nominal", format_rupiah(record.amount)),
            ];
            println!("{}", table::format_details(&fields));
        }
        OutputFormat::Json => println!("{}", json::format_json(&record)?),
    }
    Ok(())
}

/// Run the records total command
pub async fn total(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::authenticated(opts).await?;
    let total = ctx.client.records_total().await?;

    match ctx.format {
        OutputFormat::Table => println!("{} {}", "Total Pemasukan:".bold(), format_idr(total)),
        OutputFormat::Json => println!("{}", json::format_json(&TotalOutput { total })?),
    }
    Ok(())
}

/// Run the records revenue command
pub async fn revenue(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::authenticated(opts).await?;
    let revenue = ctx.client.revenue_per_month().await?;

    match ctx.format {
        OutputFormat::Table => {
            let rows: Vec<RevenueRow> = revenue.iter().map(RevenueRow::from).collect();
            println!("{}", table::format_table(&rows));
        }
        OutputFormat::Json => println!("{}", json::format_json(&revenue)?),
    }
    Ok(())
}

/// Run the records summary command.
///
/// The three requests run concurrently; a 401 on any of them shares a single
/// token refresh.
pub async fn summary(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::authenticated(opts).await?;
    let client = &ctx.client;

    let (total, revenue, mut records) = futures::try_join!(
        client.records_total(),
        client.revenue_per_month(),
        client.list_records(),
    )?;
    sort_most_recent_first(&mut records);
    records.truncate(SUMMARY_LATEST);

    match ctx.format {
        OutputFormat::Table => {
            println!("{} {}\n", "Total Pemasukan:".bold(), format_idr(total));

            let rows: Vec<RevenueRow> = revenue.iter().map(RevenueRow::from).collect();
            println!("{}", "Pendapatan per bulan".bold());
            println!("{}\n", table::format_table(&rows));

            println!("{}", "Pembayaran terakhir".bold());
            println!("{}", table::format_table(&record_rows(&records)));
        }
        OutputFormat::Json => {
            let output = SummaryOutput {
                total,
                revenue: &revenue,
                latest: &records,
            };
            println!("{}", json::format_json(&output)?);
        }
    }
    Ok(())
}
