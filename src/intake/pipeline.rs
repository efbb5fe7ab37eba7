//! Intake pipeline

use log::{debug, warn};

use super::ocr::{AmountExtractor, FilenameOcr, normalize_amount};
use super::store::{BlobStore, IntakeLedger, MemoryBlobStore};
use super::{
    ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES, DEFAULT_FOLDER, IntakeErrorCode, IntakeFailure,
    IntakeReceipt, IntakeRequest, MAX_FILE_SIZE, UploadedFile,
};

type Outcome = std::result::Result<IntakeReceipt, IntakeFailure>;

/// Runs uploads through validation, storage, extraction and recording.
pub struct IntakePipeline {
    store: Box<dyn BlobStore>,
    extractor: Box<dyn AmountExtractor>,
    ledger: IntakeLedger,
}

impl Default for IntakePipeline {
    fn default() -> Self {
        Self::new(Box::new(MemoryBlobStore::new()))
    }
}

impl IntakePipeline {
    /// Pipeline using the filename-driven extractor.
    pub fn new(store: Box<dyn BlobStore>) -> Self {
        Self {
            store,
            extractor: Box::new(FilenameOcr),
            ledger: IntakeLedger::new(),
        }
    }

    #[cfg(test)]
    pub fn with_extractor(mut self, extractor: Box<dyn AmountExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Continue from previously recorded tables
    pub fn with_ledger(mut self, ledger: IntakeLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &IntakeLedger {
        &self.ledger
    }

    /// Process one upload.
    pub fn process(&mut self, request: IntakeRequest) -> Outcome {
        let Some(file) = request.file else {
            return Err(fail(IntakeErrorCode::MissingFile));
        };

        validate(&file)?;

        let folder = request
            .folder
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        let path = format!("{}/{}", folder, file.filename);
        let store_path = format!("public/{}", path);

        if self.store.contains(&store_path) {
            debug!("Overwriting stored {}", store_path);
        }
        if let Err(e) = self.store.put(&store_path, &file.bytes) {
            debug!("Saving {} failed: {}", store_path, e);
            return Err(fail(IntakeErrorCode::SaveFailed));
        }

        if let Some(existing) = self
            .ledger
            .find_upload(request.profile_id, &file.filename)
            .cloned()
        {
            debug!("{} already uploaded as #{}", file.filename, existing.id);

            let catatan_id = match existing.catatan_id {
                Some(id) => Some(id),
                None => self.link_late(existing.id, &file),
            };

            return Ok(IntakeReceipt {
                id: existing.id,
                path,
                store_path,
                catatan_id,
            });
        }

        let amount = match self.extract(&file) {
            Ok(amount) => amount,
            Err(code) => {
                debug!("Extraction for {} failed: {}", file.filename, code);
                self.rollback(&store_path);
                return Err(fail(code));
            }
        };

        let id = self.ledger.insert_upload(
            request.profile_id,
            &file.filename,
            path.clone(),
            store_path.clone(),
        );
        let catatan_id = self.ledger.insert_record(amount);
        self.ledger.link(id, catatan_id);

        Ok(IntakeReceipt {
            id,
            path,
            store_path,
            catatan_id: Some(catatan_id),
        })
    }

    /// Single normalized amount, or the failure code explaining its absence
    fn extract(&self, file: &UploadedFile) -> std::result::Result<i64, IntakeErrorCode> {
        let outcome = self
            .extractor
            .extract(file)
            .map_err(|_| IntakeErrorCode::OcrError)?;

        match outcome.matches {
            0 => Err(IntakeErrorCode::AmountNotFound),
            1 => normalize_amount(outcome.amount).ok_or(IntakeErrorCode::AmountNotFound),
            _ => Err(IntakeErrorCode::AmbiguousAmount),
        }
    }

    /// Retry extraction for an unlinked duplicate; failures are ignored.
    fn link_late(&mut self, upload_id: u64, file: &UploadedFile) -> Option<u64> {
        let amount = self.extract(file).ok()?;
        let catatan_id = self.ledger.insert_record(amount);
        self.ledger.link(upload_id, catatan_id);
        Some(catatan_id)
    }

    fn rollback(&mut self, store_path: &str) {
        if let Err(e) = self.store.remove(store_path) {
            warn!("Failed to remove {} after rejected upload: {}", store_path, e);
        }
    }
}

fn fail(code: IntakeErrorCode) -> IntakeFailure {
    IntakeFailure::from(code)
}

fn validate(file: &UploadedFile) -> std::result::Result<(), IntakeFailure> {
    if file.size > MAX_FILE_SIZE {
        return Err(fail(IntakeErrorCode::FileTooLarge));
    }

    let ext = file.extension();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(fail(IntakeErrorCode::UnsupportedType));
    }

    if let Some(mime) = &file.mime_type {
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(fail(IntakeErrorCode::UnsupportedType));
        }
    }

    Ok(())
}
