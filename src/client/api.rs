//! Backend API traits

use async_trait::async_trait;
use serde_json::Value;

use super::models::{Catatan, LoginResponse, RevenuePerMonth, UploadResponse};
use crate::error::Result;
use crate::intake::UploadedFile;

/// Default storage folder for uploaded receipts
pub const DEFAULT_UPLOAD_FOLDER: &str = "keu";

/// Authentication endpoints
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a bearer token.
    ///
    /// The refresh credential arrives as a cookie and stays in the client's
    /// cookie store.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;
}

/// Income record endpoints
#[async_trait]
pub trait RecordsApi: Send + Sync {
    async fn list_records(&self) -> Result<Vec<Catatan>>;

    async fn get_record(&self, id: &str) -> Result<Catatan>;

    /// Sum of all record amounts, from the backend when it can say.
    async fn records_total(&self) -> Result<f64>;

    async fn revenue_per_month(&self) -> Result<Vec<RevenuePerMonth>>;
}

/// Receipt upload endpoint
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// Upload a receipt image or PDF for OCR.
    async fn upload_receipt(
        &self,
        file: &UploadedFile,
        folder: Option<&str>,
        amount: Option<f64>,
    ) -> Result<UploadResponse>;

    /// Finalize an upload so the backend records it.
    async fn submit_upload(&self, id: &str) -> Result<Value>;
}
