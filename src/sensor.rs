use std::collections::VecDeque;

use image::DynamicImage;

use crate::error::{CacheError, Result};
use crate::types::{CameraTransform, DepthBuffer};

/// Color image, depth and camera state read at one instant.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub color_image: DynamicImage,
    pub depth: DepthBuffer,
    pub camera: CameraTransform,
}

impl SensorReading {
    pub fn new(color_image: DynamicImage, depth: DepthBuffer, camera: CameraTransform) -> Self {
        SensorReading {
            color_image,
            depth,
            camera,
        }
    }

    /// Rejects readings that cannot be deprojected, e.g. while the depth sensor warms up.
    pub fn check(&self) -> Result<()> {
        if self.color_image.width() == 0 || self.color_image.height() == 0 {
            return Err(CacheError::SensorUnavailable(
                "color image is empty".to_string(),
            ));
        }
        if self.depth.is_empty() {
            return Err(CacheError::SensorUnavailable(
                "depth buffer is empty".to_string(),
            ));
        }
        if !self.camera.intrinsics.is_valid() {
            return Err(CacheError::SensorUnavailable(format!(
                "camera intrinsics are not usable: {:?}",
                self.camera.intrinsics
            )));
        }
        Ok(())
    }
}

/// Pull-based access to the current sensor state.
///
/// `capture_now` must return image, depth and camera from the same instant.
pub trait SensorSnapshotSource {
    fn capture_now(&mut self) -> Result<SensorReading>;
}

impl<S: SensorSnapshotSource + ?Sized> SensorSnapshotSource for Box<S> {
    fn capture_now(&mut self) -> Result<SensorReading> {
        (**self).capture_now()
    }
}

/// Replays queued readings in order, then reports the sensor as unavailable.
#[derive(Debug, Default)]
pub struct FixtureSource {
    readings: VecDeque<Result<SensorReading>>,
}

impl FixtureSource {
    pub fn new(readings: impl IntoIterator<Item = SensorReading>) -> FixtureSource {
        FixtureSource {
            readings: readings.into_iter().map(Ok).collect(),
        }
    }
    pub fn push(&mut self, reading: SensorReading) {
        self.readings.push_back(Ok(reading));
    }
    /// Queues a failed read, e.g. a warming-up depth sensor.
    pub fn push_unavailable(&mut self, reason: &str) {
        self.readings
            .push_back(Err(CacheError::SensorUnavailable(reason.to_string())));
    }
    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl SensorSnapshotSource for FixtureSource {
    fn capture_now(&mut self) -> Result<SensorReading> {
        self.readings.pop_front().unwrap_or_else(|| {
            Err(CacheError::SensorUnavailable(
                "fixture source exhausted".to_string(),
            ))
        })
    }
}

/// Returns the same reading on every capture.
#[derive(Debug, Clone)]
pub struct StaticSource {
    reading: SensorReading,
}

impl StaticSource {
    pub fn new(reading: SensorReading) -> StaticSource {
        StaticSource { reading }
    }
}

impl SensorSnapshotSource for StaticSource {
    fn capture_now(&mut self) -> Result<SensorReading> {
        Ok(self.reading.clone())
    }
}
