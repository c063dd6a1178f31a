use std::env;

use crate::pipeline::guard::ROW_LIMIT;

/// Upper bound for `PRESSURE_WINDOW_SECONDS`; the slider buffer is fetched in one query.
pub const MAX_PRESSURE_WINDOW_SECONDS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Warehouse (BigQuery)
    pub warehouse_base_url: String,
    pub warehouse_project_id: String,
    pub warehouse_dataset: String,
    pub warehouse_access_token: String,
    pub warehouse_timeout_seconds: u64,

    // Query policy
    pub row_limit: usize,
    pub pressure_window_seconds: i64,

    // Caching
    pub disable_cache: bool,
    pub cache_ttl_seconds: u64,
    pub cache_max_bytes: u64,
    pub pressure_cache_max_entries: u64,

    // Session extraction service
    pub session_extraction_url: Option<String>,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Application metadata
    pub deployment: Deployment,
}

impl Config {
    /// Load configuration from environment variables (and a `.env` file, if present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set,
    /// or `ConfigError::Invalid` if a policy value is unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let row_limit_raw = or_default("ROW_LIMIT", &ROW_LIMIT.to_string());
        let row_limit: usize = row_limit_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "ROW_LIMIT",
            value: row_limit_raw.clone(),
        })?;
        if row_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "ROW_LIMIT",
                value: row_limit_raw,
            });
        }

        let window_raw = or_default("PRESSURE_WINDOW_SECONDS", "60");
        let pressure_window_seconds: i64 = window_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "PRESSURE_WINDOW_SECONDS",
            value: window_raw.clone(),
        })?;
        if !(1..=MAX_PRESSURE_WINDOW_SECONDS).contains(&pressure_window_seconds) {
            return Err(ConfigError::Invalid {
                name: "PRESSURE_WINDOW_SECONDS",
                value: window_raw,
            });
        }

        Ok(Self {
            // Warehouse
            warehouse_base_url: or_default(
                "WAREHOUSE_BASE_URL",
                "https://bigquery.googleapis.com/bigquery/v2",
            )
            .trim_end_matches('/')
            .to_string(),
            warehouse_project_id: lookup("WAREHOUSE_PROJECT_ID")
                .ok_or(ConfigError::Missing("WAREHOUSE_PROJECT_ID"))?,
            warehouse_dataset: or_default("WAREHOUSE_DATASET", "aerosense-twined.greta"),
            warehouse_access_token: lookup("WAREHOUSE_ACCESS_TOKEN")
                .ok_or(ConfigError::Missing("WAREHOUSE_ACCESS_TOKEN"))?,
            warehouse_timeout_seconds: or_default("WAREHOUSE_TIMEOUT_SECONDS", "300")
                .parse()
                .unwrap_or(300),

            // Query policy
            row_limit,
            pressure_window_seconds,

            // Caching
            disable_cache: or_default("DISABLE_CACHE", "false").parse().unwrap_or(false),
            cache_ttl_seconds: or_default("CACHE_TTL_SECONDS", "3600")
                .parse()
                .unwrap_or(3600), // 1 hour default
            cache_max_bytes: or_default("CACHE_MAX_BYTES", "209715200")
                .parse()
                .unwrap_or(209_715_200), // 200MB default
            pressure_cache_max_entries: or_default("PRESSURE_CACHE_MAX_ENTRIES", "256")
                .parse()
                .unwrap_or(256),

            // Session extraction
            session_extraction_url: lookup("SESSION_EXTRACTION_URL").filter(|url| !url.is_empty()),

            // API settings
            api_host: or_default("API_HOST", "0.0.0.0"),
            api_port: or_default("API_PORT", "8050").parse().unwrap_or(8050),

            // Application metadata
            deployment: Deployment::from_str(&or_default("DEPLOYMENT", "local")),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
