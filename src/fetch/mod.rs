//! HTTP fetching with caching.
//!
//! Fetches snapshot documents from the remote document store and caches
//! them locally, so re-imports and repeated comparisons never re-download
//! a day that has already been captured.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether the server answered "no such document".
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::HttpStatus { status: 404, .. })
    }
}

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Original URL that was fetched
    pub url: Url,

    /// Path where content is cached
    pub cache_path: PathBuf,

    /// Content length in bytes
    pub content_length: usize,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,

    /// Whether this was served from cache
    pub from_cache: bool,
}

/// Metadata stored alongside cached content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub content_length: usize,
    pub etag: Option<String>,
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Directory to cache raw documents
    pub cache_dir: PathBuf,

    /// How long cached content is considered fresh.
    ///
    /// Snapshot documents are immutable once a day closes, so a long TTL is
    /// safe; the short default only matters for today's still-moving data.
    pub cache_ttl: Duration,

    /// Maximum document size to fetch
    pub max_content_size: usize,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/raw"),
            cache_ttl: Duration::from_secs(3600), // 1 hour
            max_content_size: 8 * 1024 * 1024,    // 8MB
            timeout: Duration::from_secs(30),
            user_agent: format!("ladder-tracker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP fetcher with local caching.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("ladder-tracker")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a fetcher with default configuration.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    /// Fetch a URL, using cache if available and fresh.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        if let Some(result) = self.check_cache(url).await? {
            return Ok(result);
        }
        self.fetch_and_cache(url).await
    }

    /// Force fetch from network, ignoring cache.
    pub async fn fetch_fresh(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.fetch_and_cache(url).await
    }

    /// Read a cached or fetched document as parsed JSON.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        result: &FetchResult,
    ) -> Result<T, FetchError> {
        let content = fs::read_to_string(&result.cache_path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read a cached or fetched document as text.
    pub async fn read_text(&self, result: &FetchResult) -> Result<String, FetchError> {
        Ok(fs::read_to_string(&result.cache_path).await?)
    }

    /// Check if content is cached and fresh.
    async fn check_cache(&self, url: &Url) -> Result<Option<FetchResult>, FetchError> {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);
        if !cache_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_content = fs::read_to_string(&meta_path).await?;
        let meta: CacheMetadata = match serde_json::from_str(&meta_content) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        let age = Utc::now().signed_duration_since(meta.fetched_at);
        if age.num_seconds() > self.config.cache_ttl.as_secs() as i64 {
            debug!("Cache expired for {}", url);
            return Ok(None);
        }

        debug!("Serving {} from cache", url);
        Ok(Some(FetchResult {
            url: url.clone(),
            cache_path,
            content_length: meta.content_length,
            fetched_at: meta.fetched_at,
            from_cache: true,
        }))
    }

    /// Fetch from network and cache the result.
    async fn fetch_and_cache(&self, url: &Url) -> Result<FetchResult, FetchError> {
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let content = response.bytes().await?;

        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        let cache_path = self.cache_path_for_url(url);
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&cache_path, &content).await?;

        let fetched_at = Utc::now();
        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at,
            content_length: content.len(),
            etag,
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        fs::write(self.meta_path_for_url(url), meta_json).await?;

        Ok(FetchResult {
            url: url.clone(),
            cache_path,
            content_length: content.len(),
            fetched_at,
            from_cache: false,
        })
    }

    /// Cache path for a URL: `raw/<host>/<hash>.json`.
    fn cache_path_for_url(&self, url: &Url) -> PathBuf {
        self.host_dir(url)
            .join(format!("{}.json", Self::url_hash(url)))
    }

    /// Metadata path for a URL.
    fn meta_path_for_url(&self, url: &Url) -> PathBuf {
        self.host_dir(url)
            .join(format!("{}.meta.json", Self::url_hash(url)))
    }

    fn host_dir(&self, url: &Url) -> PathBuf {
        let host = url.host_str().unwrap_or("unknown");
        self.config.cache_dir.join(host)
    }

    /// Hash a URL to a short string.
    fn url_hash(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }

    /// Purge every cached document, keeping the cache directory.
    pub async fn clear_cache(&self) -> Result<usize, FetchError> {
        let dir = &self.config.cache_dir;
        if !Path::new(dir).exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut hosts = fs::read_dir(dir).await?;
        while let Some(host) = hosts.next_entry().await? {
            if host.file_type().await?.is_dir() {
                let mut files = fs::read_dir(host.path()).await?;
                while let Some(file) = files.next_entry().await? {
                    fs::remove_file(file.path()).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> FetcherConfig {
        FetcherConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            cache_ttl: Duration::from_secs(3600),
            max_content_size: 1024 * 1024,
            timeout: Duration::from_secs(10),
            user_agent: "test-agent".to_string(),
        }
    }

    #[test]
    fn test_url_hash() {
        let url1 = Url::parse("https://example.com/ladders/1615161600/1v1/soviet.json").unwrap();
        let url2 = Url::parse("https://example.com/ladders/1615161600/1v1/usf.json").unwrap();

        let hash1 = Fetcher::url_hash(&url1);
        let hash2 = Fetcher::url_hash(&url2);

        assert_ne!(hash1, hash2);
        assert_eq!(hash1.len(), 16); // 8 bytes = 16 hex chars
    }

    #[test]
    fn test_cache_path_generation() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Fetcher::new(test_config(&temp_dir)).unwrap();

        let url = Url::parse("https://ladders.example.com/1v1/soviet.json").unwrap();
        let cache_path = fetcher.cache_path_for_url(&url);

        assert!(cache_path.starts_with(temp_dir.path()));
        assert!(cache_path.to_string_lossy().contains("ladders.example.com"));
        assert!(cache_path.to_string_lossy().ends_with(".json"));
    }

    #[tokio::test]
    async fn test_read_json_from_cache_file() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Fetcher::new(test_config(&temp_dir)).unwrap();

        let url = Url::parse("https://example.com/doc.json").unwrap();
        let cache_path = fetcher.cache_path_for_url(&url);
        fs::create_dir_all(cache_path.parent().unwrap())
            .await
            .unwrap();
        fs::write(&cache_path, r#"{"rankTotal": 5}"#).await.unwrap();

        let result = FetchResult {
            url,
            cache_path,
            content_length: 16,
            fetched_at: Utc::now(),
            from_cache: true,
        };

        let value: serde_json::Value = fetcher.read_json(&result).await.unwrap();
        assert_eq!(value["rankTotal"], 5);
    }

    #[tokio::test]
    async fn test_check_cache_empty() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Fetcher::new(test_config(&temp_dir)).unwrap();

        let url = Url::parse("https://example.com/doc.json").unwrap();
        assert!(fetcher.check_cache(&url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Fetcher::new(test_config(&temp_dir)).unwrap();

        let host_dir = temp_dir.path().join("example.com");
        fs::create_dir_all(&host_dir).await.unwrap();
        fs::write(host_dir.join("abc.json"), "{}").await.unwrap();

        let removed = fetcher.clear_cache().await.unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_cache_metadata_serialization() {
        let meta = CacheMetadata {
            url: "https://example.com".to_string(),
            fetched_at: Utc::now(),
            content_length: 1234,
            etag: Some("abc123".to_string()),
        };

        let json = serde_json::to_string(&meta).unwrap();
        let parsed: CacheMetadata = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.url, meta.url);
        assert_eq!(parsed.content_length, meta.content_length);
    }

    #[test]
    fn test_fetcher_config_default() {
        let config = FetcherConfig::default();

        assert_eq!(config.cache_dir, PathBuf::from("./data/raw"));
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert!(config.user_agent.starts_with("ladder-tracker/"));
    }

    #[test]
    fn test_not_found_detection() {
        let err = FetchError::HttpStatus {
            status: 404,
            message: "Not Found".to_string(),
        };
        assert!(err.is_not_found());

        let err = FetchError::HttpStatus {
            status: 500,
            message: "Internal Server Error".to_string(),
        };
        assert!(!err.is_not_found());
    }
}
