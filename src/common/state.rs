use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppResult;
use crate::services::cache::{PressureWindowCache, ResponseCache, SensorTypeCache};
use crate::services::extraction::SessionExtractor;
use crate::warehouse::Warehouse;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub warehouse: Arc<dyn Warehouse>,
    pub response_cache: ResponseCache,
    pub pressure_cache: PressureWindowCache,
    pub sensor_type_cache: SensorTypeCache,
    pub extractor: Arc<SessionExtractor>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the extraction HTTP client cannot be built.
    pub fn new(config: Config, warehouse: Arc<dyn Warehouse>) -> AppResult<Self> {
        let ttl = Duration::from_secs(config.cache_ttl_seconds);

        let (response_cache, pressure_cache, sensor_type_cache) = if config.disable_cache {
            tracing::warn!("Response caching DISABLED");
            (
                ResponseCache::disabled(),
                PressureWindowCache::disabled(),
                SensorTypeCache::disabled(),
            )
        } else {
            (
                // Weighted by byte size, not entry count
                ResponseCache::with_ttl(ttl, config.cache_max_bytes),
                PressureWindowCache::unbounded_in_time(config.pressure_cache_max_entries),
                SensorTypeCache::with_ttl(ttl),
            )
        };

        let extractor = SessionExtractor::new(config.session_extraction_url.clone())?;

        Ok(Self {
            config: Arc::new(config),
            warehouse,
            response_cache,
            pressure_cache,
            sensor_type_cache,
            extractor: Arc::new(extractor),
        })
    }
}
