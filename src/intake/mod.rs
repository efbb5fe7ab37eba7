//! Receipt intake: validate, store, extract the amount, record
//!
//! Processing never raises; every outcome is either an [`IntakeReceipt`] or
//! an [`IntakeFailure`] carrying a stable code.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod ocr;
pub mod pipeline;
pub mod store;

pub use pipeline::IntakePipeline;
pub use store::{DirBlobStore, IntakeLedger};

/// Largest accepted upload, in bytes
pub const MAX_FILE_SIZE: u64 = 1_048_576;

/// Accepted file extensions, lower-case
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Accepted MIME types, when the client supplies one
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Folder used when the request names none
pub const DEFAULT_FOLDER: &str = "keu";

/// A file as received from the client
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub size: u64,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        let size = bytes.len() as u64;
        Self {
            filename: filename.into(),
            bytes,
            mime_type,
            size,
        }
    }

    /// Read a local file, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = guess_mime(&filename).map(str::to_string);

        Ok(Self::new(filename, bytes, mime_type))
    }

    /// Lower-cased text after the last `.`, empty when there is none
    pub fn extension(&self) -> String {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    }
}

fn guess_mime(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "pdf" => Some("application/pdf"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// One intake call
#[derive(Debug, Clone, Default)]
pub struct IntakeRequest {
    pub file: Option<UploadedFile>,
    pub profile_id: Option<u64>,
    pub folder: Option<String>,
}

#[cfg(test)]
impl IntakeRequest {
    pub fn new(file: UploadedFile) -> Self {
        Self {
            file: Some(file),
            ..Default::default()
        }
    }

    pub fn profile(mut self, profile_id: u64) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }
}

/// Stable failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeErrorCode {
    MissingFile,
    FileTooLarge,
    UnsupportedType,
    SaveFailed,
    OcrError,
    AmountNotFound,
    AmbiguousAmount,
}

impl IntakeErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeErrorCode::MissingFile => "missing_file",
            IntakeErrorCode::FileTooLarge => "file_too_large",
            IntakeErrorCode::UnsupportedType => "unsupported_type",
            IntakeErrorCode::SaveFailed => "save_failed",
            IntakeErrorCode::OcrError => "ocr_error",
            IntakeErrorCode::AmountNotFound => "amount_not_found",
            IntakeErrorCode::AmbiguousAmount => "ambiguous_amount",
        }
    }

    /// Message shown to the uploader
    pub fn message(&self) -> &'static str {
        match self {
            IntakeErrorCode::MissingFile => "file missing",
            IntakeErrorCode::FileTooLarge => "file too large (max 1MB)",
            IntakeErrorCode::UnsupportedType => "File tidak dikenali, gunakan file lain!",
            IntakeErrorCode::SaveFailed => "save_failed",
            IntakeErrorCode::OcrError => "OCR internal error",
            IntakeErrorCode::AmountNotFound => "Nominal tidak ditemukan, gunakan file lain",
            IntakeErrorCode::AmbiguousAmount => "Gagal! Gunakan file lain",
        }
    }
}

impl std::fmt::Display for IntakeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an intake call was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct IntakeFailure {
    pub code: IntakeErrorCode,
    pub message: String,
}

impl From<IntakeErrorCode> for IntakeFailure {
    fn from(code: IntakeErrorCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }
}

/// Result of a successful (or duplicate) intake
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeReceipt {
    pub id: u64,
    /// `<folder>/<filename>`
    pub path: String,
    /// `public/<folder>/<filename>`
    pub store_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catatan_id: Option<u64>,
}
