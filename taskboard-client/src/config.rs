/// Configuration management for the client
///
/// This module loads configuration from environment variables (and a `.env`
/// file when present) and provides a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `TASKBOARD_API__BASE_URL`: REST backend base URL (required)
/// - `TASKBOARD_API__TIMEOUT_SECS`: Request timeout (default: 30)
/// - `TASKBOARD_MEDIA__HOST`: Media host for uploads (optional)
/// - `TASKBOARD_MEDIA__CLOUD_NAME`: Media account name (optional)
/// - `TASKBOARD_MEDIA__UPLOAD_PRESET`: Upload preset (default: Image_Preset)
/// - `TASKBOARD_SESSION__PATH`: Session file (default: taskboard-session.json)
/// - `TASKBOARD_CACHE__KEEP_UNUSED_SECS`: Lifetime of unused cache entries (default: 60)
/// - `RUST_LOG`: Log level
///
/// # Example
///
/// ```no_run
/// use taskboard_client::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Talking to {}", config.api.base_url);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// REST backend configuration
    pub api: ApiConfig,

    /// Media host configuration
    #[serde(default)]
    pub media: MediaConfig,

    /// Session persistence configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Query cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// REST backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Media host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Media host URL; uploads are disabled when absent
    pub host: Option<String>,

    /// Account name on the media host
    pub cloud_name: Option<String>,

    /// Unsigned upload preset
    #[serde(default = "default_upload_preset")]
    pub upload_preset: String,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the persisted session
    pub path: PathBuf,
}

/// Query cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long an entry with no subscribers is kept
    pub keep_unused_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_upload_preset() -> String {
    "Image_Preset".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            path: PathBuf::from("taskboard-session.json"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            keep_unused_secs: 60,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    pub fn keep_unused(&self) -> Duration {
        Duration::from_secs(self.keep_unused_secs)
    }
}

impl MediaConfig {
    /// Upload endpoint, if the media host is configured
    pub fn upload_url(&self) -> Option<String> {
        let host = self.host.as_deref()?.trim_end_matches('/');
        let cloud = self.cloud_name.as_deref()?;
        Some(format!("{}/{}/image/upload", host, cloud))
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TASKBOARD_API__BASE_URL` is missing
    /// - A value has the wrong type
    /// - The base URL is not an http(s) URL
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("api.timeout_secs", default_timeout_secs())?
            .set_default("media.upload_preset", default_upload_preset())?
            .set_default("session.path", "taskboard-session.json")?
            .set_default("cache.keep_unused_secs", 60)?
            .add_source(
                config::Environment::with_prefix("TASKBOARD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Configuration with defaults for everything but the base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Config {
            api: ApiConfig {
                base_url: base_url.into(),
                timeout_secs: default_timeout_secs(),
            },
            media: MediaConfig {
                upload_preset: default_upload_preset(),
                ..MediaConfig::default()
            },
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Checks values that deserialize fine but cannot work
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = reqwest::Url::parse(&self.api.base_url)
            .map_err(|e| anyhow::anyhow!("api.base_url is not a valid URL: {}", e))?;

        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api.base_url must use http or https");
        }

        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than 0");
        }

        Ok(())
    }
}
