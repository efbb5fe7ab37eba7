//! Session lifecycle: stored credentials and proactive expiry

use serde::{Deserialize, Serialize};

pub mod storage;
pub mod store;
pub mod watchdog;

#[cfg(test)]
pub use storage::MemoryStorage;
pub use storage::FileStorage;
pub use store::SessionStore;
pub use watchdog::SessionWatchdog;

/// Profile of the logged-in user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserProfile {
    /// Best label for display
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("unknown")
    }
}
