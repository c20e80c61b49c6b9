//! Data-access configuration
//!
//! Loaded in layers: compiled defaults, then an optional `acton-data.toml`,
//! then `ACTON_DATA_`-prefixed environment variables. Later layers win.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::pagination::PaginationFilter;

/// Tunables for the data-access layer
///
/// # Example
///
/// ```rust
/// use acton_data::config::DataAccessConfig;
///
/// // ACTON_DATA_AUDIT_ENABLED=false would override the default here.
/// let config = DataAccessConfig::load().unwrap_or_default();
/// assert!(config.max_page_size >= config.default_page_size);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataAccessConfig {
    /// Whether commits describe their changes to the audit recorder
    pub audit_enabled: bool,
    /// Page size used when a request does not name one
    pub default_page_size: u64,
    /// Upper bound applied to requested page sizes
    pub max_page_size: u64,
    /// Default cache timeout, in seconds, for caching hints without one
    pub default_cache_timeout_secs: u64,
}

impl Default for DataAccessConfig {
    fn default() -> Self {
        Self {
            audit_enabled: true,
            default_page_size: 20,
            max_page_size: 1000,
            default_cache_timeout_secs: 300,
        }
    }
}

impl DataAccessConfig {
    /// Load configuration from defaults, `acton-data.toml`, and environment
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("acton-data.toml"))
            .merge(Env::prefixed("ACTON_DATA_"))
            .extract()
    }

    /// Clamp a pagination filter to the configured maximum page size
    #[must_use]
    pub fn clamp(&self, filter: PaginationFilter) -> PaginationFilter {
        PaginationFilter::new(
            filter.page_number(),
            filter.page_size().min(self.max_page_size),
        )
    }

    /// The default page, for requests that specify nothing
    #[must_use]
    pub fn default_page(&self) -> PaginationFilter {
        PaginationFilter::new(1, self.default_page_size)
    }
}
