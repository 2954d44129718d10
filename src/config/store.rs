//! Row store configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Row store configuration (PostgREST-style REST endpoint).
///
/// Both the URL and the service key are optional: without them the
/// service runs with persistence disabled (chat turns are not recorded
/// and CRUD endpoints answer with a configuration error).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the row store (e.g. https://xyz.supabase.co)
    pub url: Option<String>,

    /// Service role key used for both apikey and bearer headers
    pub service_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if the store is fully configured
    pub fn is_configured(&self) -> bool {
        self.url.as_ref().is_some_and(|u| !u.is_empty())
            && self.service_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate store configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty()) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidStoreUrl);
            }
            if !self.service_key.as_ref().is_some_and(|k| !k.is_empty()) {
                return Err(ValidationError::StoreKeyMissing);
            }
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
