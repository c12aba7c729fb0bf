use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::io::object_from_json;

/// How a depth sample relates to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthEncoding {
    /// Distance from the camera center along the pixel's view ray.
    #[default]
    RayDistance,
    /// Distance along the optical axis.
    ViewZ,
}

/// Optional bound on how many snapshots stay alive and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionPolicy {
    pub max_live: Option<usize>,
    pub max_age_ms: Option<u64>,
}

impl EvictionPolicy {
    pub fn is_bounded(&self) -> bool {
        self.max_live.is_some() || self.max_age_ms.is_some()
    }
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub invalid_depth_sentinel: f32,
    pub max_depth: Option<f32>,
    pub depth_encoding: DepthEncoding,
    pub eviction: EvictionPolicy,
    /// Disposing an unknown handle is an error when set, a logged no-op otherwise.
    pub strict_dispose: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            invalid_depth_sentinel: 0.0,
            max_depth: None,
            depth_encoding: DepthEncoding::RayDistance,
            eviction: EvictionPolicy::default(),
            strict_dispose: true,
        }
    }
}

impl CacheConfig {
    pub fn from_json_file(path: &str) -> Result<CacheConfig> {
        let config: CacheConfig = object_from_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.invalid_depth_sentinel.is_nan() {
            return Err(CacheError::InvalidConfig(
                "invalid_depth_sentinel must not be NaN".to_string(),
            ));
        }
        if let Some(max_depth) = self.max_depth {
            if !(max_depth.is_finite() && max_depth > 0.0) {
                return Err(CacheError::InvalidConfig(format!(
                    "max_depth must be positive, got {}",
                    max_depth
                )));
            }
        }
        if self.eviction.max_live == Some(0) {
            return Err(CacheError::InvalidConfig(
                "eviction.max_live must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
