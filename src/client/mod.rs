//! Catatan Keuangan API client

pub mod aliases;
pub mod api;
pub mod catatan;
pub mod gateway;
pub mod models;

pub use api::{AuthApi, DEFAULT_UPLOAD_FOLDER, RecordsApi, UploadApi};
pub use catatan::CatatanClient;
pub use gateway::{HttpRefresher, RequestGateway, SESSION_EXPIRED_MESSAGE, SessionListener};
pub use models::{Catatan, RecordFilter, RevenuePerMonth};
