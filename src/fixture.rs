//! Recorded captures on disk and offline replay through the cache.

use image::{DynamicImage, RgbImage};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;
use crate::depth_cache::DepthCache;
use crate::error::{CacheError, Result};
use crate::frame_store::DepthSnapshot;
use crate::sensor::{SensorReading, StaticSource};
use crate::session::DetectionPoint;
use crate::types::{CameraIntrinsics, CameraTransform, PixelCoordinate, RvecTvec};

/// One capture plus the detections that came back for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureFixture {
    #[serde(default)]
    pub name: String,
    /// Loaded when present, otherwise a black image of `color_w_h` is used.
    #[serde(default)]
    pub image_path: Option<String>,
    pub color_w_h: (u32, u32),
    pub depth_w_h: (u32, u32),
    /// Row-major depth samples.
    pub depth: Vec<f32>,
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub pose: RvecTvec,
    #[serde(default)]
    pub detections: Vec<DetectionPoint>,
}

impl CaptureFixture {
    pub fn to_reading(&self) -> Result<SensorReading> {
        let (dw, dh) = self.depth_w_h;
        let expected = (dw as usize).checked_mul(dh as usize);
        if expected != Some(self.depth.len()) {
            return Err(CacheError::FixtureMismatch(format!(
                "{}: {} depth samples for a {}x{} buffer",
                self.name,
                self.depth.len(),
                dw,
                dh
            )));
        }
        let color_image = match &self.image_path {
            Some(path) => {
                let img = image::open(path)?;
                if (img.width(), img.height()) != self.color_w_h {
                    return Err(CacheError::FixtureMismatch(format!(
                        "{}: image is {}x{}, expected {:?}",
                        path,
                        img.width(),
                        img.height(),
                        self.color_w_h
                    )));
                }
                img
            }
            None => DynamicImage::ImageRgb8(RgbImage::new(self.color_w_h.0, self.color_w_h.1)),
        };
        let depth = na::DMatrix::from_row_slice(dh as usize, dw as usize, &self.depth);
        let camera = CameraTransform::new(self.intrinsics, self.pose.to_na_isometry3());
        Ok(SensorReading::new(color_image, depth, camera))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDetection {
    pub label: String,
    pub pixel: PixelCoordinate,
    pub world: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub name: String,
    pub detections: Vec<ReplayDetection>,
}

impl ReplayRecord {
    pub fn resolved(&self) -> usize {
        self.detections.iter().filter(|d| d.world.is_some()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub timestamp: String,
    pub fixtures: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub records: Vec<ReplayRecord>,
}

impl ReplayReport {
    pub fn new(records: Vec<ReplayRecord>) -> ReplayReport {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let resolved = records.iter().map(|r| r.resolved()).sum();
        let total: usize = records.iter().map(|r| r.detections.len()).sum();
        ReplayReport {
            timestamp: timestamp.to_string(),
            fixtures: records.len(),
            resolved,
            unresolved: total - resolved,
            records,
        }
    }
}

/// Runs one fixture through a fresh cache: save, deproject every detection, dispose.
pub fn replay_fixture(fixture: &CaptureFixture, config: &CacheConfig) -> Result<ReplayRecord> {
    replay_fixture_with(fixture, config, |_, _| {})
}

/// Like [`replay_fixture`], handing the live snapshot and the result to `inspect` before disposal.
pub fn replay_fixture_with<F>(
    fixture: &CaptureFixture,
    config: &CacheConfig,
    inspect: F,
) -> Result<ReplayRecord>
where
    F: FnOnce(&DepthSnapshot, &ReplayRecord),
{
    let reading = fixture.to_reading()?;
    let mut cache = DepthCache::with_config(StaticSource::new(reading), config.clone())?;
    let handle = cache.save_depth_frame()?;
    let pixels: Vec<PixelCoordinate> = fixture.detections.iter().map(|d| d.pixel).collect();
    let worlds = cache.world_positions(&pixels, handle)?;

    let detections = fixture
        .detections
        .iter()
        .zip(worlds)
        .map(|(d, w)| ReplayDetection {
            label: d.label.clone(),
            pixel: d.pixel,
            world: w.map(|p| [p.x, p.y, p.z]),
        })
        .collect();
    let record = ReplayRecord {
        name: fixture.name.clone(),
        detections,
    };
    inspect(cache.snapshot(handle)?, &record);
    cache.dispose_depth_frame(handle)?;
    Ok(record)
}
