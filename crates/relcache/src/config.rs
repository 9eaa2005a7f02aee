use std::env;

use url::Url;

use relcache_core::cache::{
    CacheError, ResolverConfig, Result, DEFAULT_MAX_DEPTH, DEFAULT_SCAN_PAGE_SIZE,
};

/// Scheme of plaintext endpoints.
pub const PLAIN_SCHEME: &str = "redis";

/// Scheme of TLS endpoints.
pub const TLS_SCHEME: &str = "rediss";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Store endpoint (default: "redis://localhost:6379")
    pub redis_url: String,
    /// Skip certificate verification on `rediss://` endpoints (default: false)
    pub skip_tls_verify: bool,
    /// Keys requested per SCAN round trip when expanding patterns (default: 1,000)
    pub scan_page_size: usize,
    /// Deepest relevance chain followed by cascading deletes (default: 16)
    pub max_depth: usize,
    /// Capacity of the in-memory store (default: 10,000)
    pub memory_max_entries: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `REDIS_URL` - Store endpoint (default: "redis://localhost:6379")
    /// - `RELCACHE_SKIP_TLS_VERIFY` - Skip TLS verification (default: false)
    /// - `RELCACHE_SCAN_PAGE_SIZE` - SCAN page size (default: 1,000)
    /// - `RELCACHE_MAX_DEPTH` - Relevance depth limit (default: 16)
    /// - `RELCACHE_MEMORY_MAX_ENTRIES` - In-memory store capacity (default: 10,000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |name: &str, default: usize| {
            lookup(name)
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        Self {
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            skip_tls_verify: lookup("RELCACHE_SKIP_TLS_VERIFY")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
            scan_page_size: parsed("RELCACHE_SCAN_PAGE_SIZE", DEFAULT_SCAN_PAGE_SIZE),
            max_depth: parsed("RELCACHE_MAX_DEPTH", DEFAULT_MAX_DEPTH),
            memory_max_entries: parsed("RELCACHE_MEMORY_MAX_ENTRIES", 10_000),
        }
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn with_skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    pub fn with_scan_page_size(mut self, size: usize) -> Self {
        self.scan_page_size = size;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Resolution settings used by cascading deletes.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            scan_page_size: self.scan_page_size.max(1),
            max_depth: self.max_depth,
        }
    }

    /// Returns the URL handed to the Redis client.
    ///
    /// TLS endpoints with verification skipped get the `#insecure` fragment.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the endpoint is not a valid
    /// `redis://` or `rediss://` URL with a host.
    pub fn connection_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.redis_url).map_err(|e| {
            CacheError::ConnectionFailed(format!("invalid endpoint {:?}: {e}", self.redis_url))
        })?;

        if url.host_str().is_none_or(str::is_empty) {
            return Err(CacheError::ConnectionFailed(format!(
                "endpoint {:?} has no host",
                self.redis_url
            )));
        }

        match url.scheme() {
            PLAIN_SCHEME => {}
            TLS_SCHEME => {
                if self.skip_tls_verify {
                    url.set_fragment(Some("insecure"));
                }
            }
            other => {
                return Err(CacheError::ConnectionFailed(format!(
                    "unsupported endpoint scheme {other:?}"
                )))
            }
        }

        Ok(url.to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
