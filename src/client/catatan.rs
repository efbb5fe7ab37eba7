//! Catatan Keuangan backend client

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use super::aliases;
use super::api::{AuthApi, DEFAULT_UPLOAD_FOLDER, RecordsApi, UploadApi};
use super::gateway::{MultipartBody, RequestGateway, decode_response};
use super::models::{
    Catatan, LoginRequest, LoginResponse, RevenuePerMonth, UploadResponse, total_amount,
};
use crate::config::Endpoints;
use crate::error::{ApiError, Result};
use crate::intake::UploadedFile;
use crate::session::UserProfile;

/// Client for the records, auth and upload services.
///
/// Record and upload calls go through the gateway; login is sent without a
/// bearer token on the same HTTP client so the refresh cookie is shared.
pub struct CatatanClient {
    gateway: Arc<RequestGateway>,
    auth_url: String,
    upload_url: String,
}

impl CatatanClient {
    pub fn new(gateway: Arc<RequestGateway>, endpoints: &Endpoints) -> Self {
        Self {
            gateway,
            auth_url: endpoints.auth_api_url.trim_end_matches('/').to_string(),
            upload_url: endpoints.upload_api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }
}

#[async_trait]
impl AuthApi for CatatanClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = format!("{}/login", self.auth_url);
        debug!("POST {}", url);

        let response = self
            .gateway
            .http()
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(ApiError::from)?;

        let raw: Value = decode_response(response).await?;
        let mut login = LoginResponse::from_value(&raw)?;
        if login.user.is_none() {
            login.user = Some(UserProfile {
                username: Some(username.to_string()),
                ..Default::default()
            });
        }

        self.gateway.set_token(Some(login.token.clone())).await;
        Ok(login)
    }
}

#[async_trait]
impl RecordsApi for CatatanClient {
    async fn list_records(&self) -> Result<Vec<Catatan>> {
        let raw: Value = self.gateway.get("/catatan").await?;

        let items = match &raw {
            Value::Array(items) => items,
            other => other
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| ApiError::invalid_response("expected a list of records"))?,
        };

        Ok(items.iter().map(Catatan::from_value).collect())
    }

    async fn get_record(&self, id: &str) -> Result<Catatan> {
        let raw: Value = self.gateway.get(&format!("/catatan/{}", id)).await?;
        Ok(Catatan::from_value(&raw))
    }

    async fn records_total(&self) -> Result<f64> {
        let had_token = self.gateway.token().await.is_some();

        match self.gateway.get::<Value>("/catatan/total").await {
            Ok(raw) => {
                if let Some(total) = aliases::pick_number(&raw, &["total"]) {
                    return Ok(total);
                }
                debug!("Total endpoint returned no total, summing records");
            }
            Err(e) => {
                // A rejected or torn-down session fails the list call the same way
                let session_lost = had_token && self.gateway.token().await.is_none();
                if e.is_unauthorized() || session_lost {
                    return Err(e.into());
                }
                debug!("Total endpoint failed ({}), summing records", e);
            }
        }

        let records = self.list_records().await?;
        Ok(total_amount(&records))
    }

    async fn revenue_per_month(&self) -> Result<Vec<RevenuePerMonth>> {
        Ok(self.gateway.get("/catatan/revenue").await?)
    }
}

#[async_trait]
impl UploadApi for CatatanClient {
    async fn upload_receipt(
        &self,
        file: &UploadedFile,
        folder: Option<&str>,
        amount: Option<f64>,
    ) -> Result<UploadResponse> {
        let mut form = MultipartBody::new()
            .file(
                "file",
                file.filename.clone(),
                file.bytes.clone(),
                file.mime_type.clone(),
            )
            .text("folder", folder.unwrap_or(DEFAULT_UPLOAD_FOLDER));
        if let Some(amount) = amount {
            form = form.text("amount", amount.to_string());
        }

        let url = format!("{}/uploads", self.upload_url);
        Ok(self.gateway.upload(&url, form).await?)
    }

    async fn submit_upload(&self, id: &str) -> Result<Value> {
        let url = format!("{}/uploads/{}/submit", self.upload_url, id);
        Ok(self.gateway.post(&url, &serde_json::json!({})).await?)
    }
}
