//! Local receipt intake command

use std::path::{Path, PathBuf};

use colored::Colorize;
use log::debug;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::error::{Error, Result};
use crate::intake::{
    DirBlobStore, IntakeFailure, IntakeLedger, IntakePipeline, IntakeReceipt, IntakeRequest,
    UploadedFile,
};
use crate::output::{json, table};

/// Ledger file kept next to stored receipts
const LEDGER_FILE: &str = "ledger.yaml";

/// Options for one intake run
#[derive(Debug, Clone, Default)]
pub struct IntakeOptions {
    pub profile_id: Option<u64>,
    pub folder: Option<String>,
    pub store_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct IntakeResult {
    file: String,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Outcome {
    Ok(IntakeReceipt),
    Rejected(IntakeFailure),
}

#[derive(Tabled)]
struct IntakeRow {
    #[tabled(rename = "FILE")]
    file: String,

    #[tabled(rename = "STATUS")]
    status: String,

    #[tabled(rename = "UPLOAD")]
    id: String,

    #[tabled(rename = "PATH")]
    path: String,

    #[tabled(rename = "CATATAN")]
    catatan: String,
}

impl From<&IntakeResult> for IntakeRow {
    fn from(result: &IntakeResult) -> Self {
        match &result.outcome {
            Outcome::Ok(receipt) => Self {
                file: result.file.clone(),
                status: "ok".to_string(),
                id: receipt.id.to_string(),
                path: receipt.path.clone(),
                catatan: receipt
                    .catatan_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            },
            Outcome::Rejected(failure) => Self {
                file: result.file.clone(),
                status: failure.code.to_string(),
                id: "-".to_string(),
                path: "-".to_string(),
                catatan: failure.message.clone(),
            },
        }
    }
}

fn load_file(path: &Path) -> Option<UploadedFile> {
    match UploadedFile::from_path(path) {
        Ok(file) => Some(file),
        Err(e) => {
            debug!("Could not read {}: {}", path.display(), e);
            None
        }
    }
}

fn open_pipeline(store_dir: Option<&Path>) -> Result<IntakePipeline> {
    match store_dir {
        Some(dir) => {
            let ledger = IntakeLedger::load(&dir.join(LEDGER_FILE))?;
            Ok(IntakePipeline::new(Box::new(DirBlobStore::new(dir))).with_ledger(ledger))
        }
        None => Ok(IntakePipeline::default()),
    }
}

/// Run the intake command over `files`, in order, through one pipeline.
pub fn run(opts: &GlobalOptions, files: &[PathBuf], options: &IntakeOptions) -> Result<()> {
    let mut pipeline = open_pipeline(options.store_dir.as_deref())?;

    let results: Vec<IntakeResult> = files
        .iter()
        .map(|path| {
            let request = IntakeRequest {
                file: load_file(path),
                profile_id: options.profile_id,
                folder: options.folder.clone(),
            };
            let outcome = match pipeline.process(request) {
                Ok(receipt) => Outcome::Ok(receipt),
                Err(failure) => Outcome::Rejected(failure),
            };
            IntakeResult {
                file: path.display().to_string(),
                outcome,
            }
        })
        .collect();

    if let Some(dir) = &options.store_dir {
        let ledger = pipeline.ledger();
        ledger.save(&dir.join(LEDGER_FILE))?;
        debug!(
            "Ledger holds {} uploads and {} records",
            ledger.uploads().len(),
            ledger.records().len()
        );
    }

    match opts.format {
        OutputFormat::Json => println!("{}", json::format_json(&results)?),
        OutputFormat::Table => {
            let rows: Vec<IntakeRow> = results.iter().map(IntakeRow::from).collect();
            println!("{}", table::format_table(&rows));
        }
    }

    let rejected = results
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Rejected(_)))
        .count();
    if rejected > 0 {
        return Err(Error::Other(format!(
            "{} of {} receipts rejected",
            rejected,
            results.len()
        )));
    }

    if opts.format == OutputFormat::Table {
        println!("{} {} receipts recorded", "✓".green(), results.len());
    }
    Ok(())
}
