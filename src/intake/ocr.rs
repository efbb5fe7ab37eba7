//! Amount extraction

use thiserror::Error;

use super::UploadedFile;

/// Amounts above this are assumed to be in cents
const CENTS_THRESHOLD: i64 = 1_000_000;

/// What the extractor saw in a receipt
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OcrOutcome {
    /// Number of candidate amounts found
    pub matches: usize,
    /// The amount, when exactly one was read
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("OCR failed: {0}")]
pub struct OcrError(pub String);

/// Reads the income amount from a receipt.
pub trait AmountExtractor: Send + Sync {
    fn extract(&self, file: &UploadedFile) -> Result<OcrOutcome, OcrError>;
}

/// Deterministic stand-in for a real OCR engine, driven by the filename.
///
/// - `ocr_error` fails,
/// - `none` finds nothing,
/// - `ambig` finds two amounts,
/// - `amount-<digits>` finds that amount,
/// - anything else finds one match with no readable value.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameOcr;

impl AmountExtractor for FilenameOcr {
    fn extract(&self, file: &UploadedFile) -> Result<OcrOutcome, OcrError> {
        let name = file.filename.to_lowercase();

        if name.contains("ocr_error") {
            return Err(OcrError("ocr_error".to_string()));
        }
        if name.contains("none") {
            return Ok(OcrOutcome::default());
        }
        if name.contains("ambig") {
            return Ok(OcrOutcome {
                matches: 2,
                amount: None,
            });
        }

        Ok(OcrOutcome {
            matches: 1,
            amount: amount_in_name(&name),
        })
    }
}

/// First `amount-<digits>` in `name`
fn amount_in_name(name: &str) -> Option<f64> {
    const MARKER: &str = "amount-";

    name.match_indices(MARKER).find_map(|(start, _)| {
        let rest = &name[start + MARKER.len()..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        rest[..end].parse::<f64>().ok()
    })
}

/// Turn a raw extracted value into a whole amount.
///
/// Missing, NaN and zero values yield `None`. Values are floored; anything
/// above a million is taken to be cents and divided by 100.
// TODO: replace the cents heuristic once the OCR engine reports currency units
pub fn normalize_amount(raw: Option<f64>) -> Option<i64> {
    let raw = raw.filter(|v| !v.is_nan() && *v != 0.0)?;
    let n = raw.floor() as i64;

    if n > CENTS_THRESHOLD {
        return Some((n as f64 / 100.0).round() as i64);
    }
    Some(n)
}
