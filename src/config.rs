use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Agriverse";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when `AGRIVERSE_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "agriverse_lib=info,agriverse=info,warn"
}

// ═══════════════════════════════════════════════════════════
// ServiceConfig — where the REST collaborators live
// ═══════════════════════════════════════════════════════════

/// Connection settings for the Agriverse REST backend.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL without trailing slash.
    pub api_base_url: String,
    /// Bearer token attached to every request, if logged in.
    pub bearer_token: Option<String>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout. Classification of several photos is slow,
    /// so this is generous.
    pub request_timeout: Duration,
}

impl ServiceConfig {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Read `AGRIVERSE_API_URL` and `AGRIVERSE_TOKEN` from the environment.
    pub fn from_env() -> Self {
        let url = std::env::var("AGRIVERSE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let token = std::env::var("AGRIVERSE_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self::new(&url).with_token(token)
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

// ═══════════════════════════════════════════════════════════
// CompressionConfig — photo re-encoding
// ═══════════════════════════════════════════════════════════

/// How accepted photos are re-encoded before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Longest side in pixels; larger photos are scaled down, smaller ones
    /// are left alone.
    pub max_dimension: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1200,
            quality: 80,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_agriverse() {
        assert_eq!(APP_NAME, "Agriverse");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn service_config_trims_trailing_slash() {
        let config = ServiceConfig::new("http://10.0.0.2:8080/");
        assert_eq!(config.api_base_url, "http://10.0.0.2:8080");
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn default_points_at_local_backend() {
        assert_eq!(ServiceConfig::default().api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn log_filter_names_this_crate() {
        assert!(default_log_filter().contains("agriverse_lib"));
    }

    #[test]
    fn compression_defaults() {
        let config = CompressionConfig::default();
        assert_eq!(config.max_dimension, 1200);
        assert_eq!(config.quality, 80);
    }
}
