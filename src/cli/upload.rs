//! Receipt upload command

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::client::{DEFAULT_UPLOAD_FOLDER, UploadApi};
use crate::error::Result;
use crate::intake::UploadedFile;
use crate::output::formatters::format_rupiah;
use crate::output::{json, table};

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run the upload command
pub async fn run(
    opts: &GlobalOptions,
    path: &Path,
    folder: Option<&str>,
    amount: Option<f64>,
    submit: bool,
) -> Result<()> {
    let ctx = CommandContext::authenticated(opts).await?;
    let file = UploadedFile::from_path(path)?;

    let pb = spinner(format!("Uploading {}...", file.filename));
    let result = ctx.client.upload_receipt(&file, folder, amount).await;
    pb.finish_and_clear();
    let resp = result?;

    let submitted = if submit {
        let pb = spinner(format!("Submitting upload {}...", resp.id));
        let result = ctx.client.submit_upload(&resp.id).await;
        pb.finish_and_clear();
        Some(result?)
    } else {
        None
    };

    match ctx.format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&resp)?;
            if let (Some(submitted), Some(obj)) = (submitted, value.as_object_mut()) {
                obj.insert("submitted".to_string(), submitted);
            }
            println!("{}", json::format_json(&value)?)
        }
        OutputFormat::Table => {
            println!("{} Uploaded {}", "✓".green(), resp.filename.bold());

            let ocr = match (resp.ocr_found, resp.ocr_amount) {
                (true, Some(amount)) => format_rupiah(amount),
                (true, None) => "found".to_string(),
                (false, _) => "not found".to_string(),
            };
            let fields = [
                ("ID", resp.id.clone()),
                ("Folder", folder.unwrap_or(DEFAULT_UPLOAD_FOLDER).to_string()),
                ("URL", resp.url.clone().unwrap_or_else(|| "-".to_string())),
                ("OCR", ocr),
            ];
            println!("{}", table::format_details(&fields));

            if let Some(message) = resp.message {
                println!("  {}", message.dimmed());
            }
            if submitted.is_some() {
                println!("{} Submitted upload {}", "✓".green(), resp.id);
            }
        }
    }
    Ok(())
}
