use image::DynamicImage;
use log::{debug, error, warn};

use crate::config::CacheConfig;
use crate::deproject::Deprojector;
use crate::error::{CacheError, Result};
use crate::frame_store::{DepthSnapshot, FrameStore};
use crate::sensor::SensorSnapshotSource;
use crate::types::{FrameHandle, PixelCoordinate, WorldPoint};

/// Entry point for everything outside the cache.
///
/// Each handle goes `captured -> read any number of times -> disposed`. Reads after
/// disposal fail with [`CacheError::UnknownHandle`]; a depth miss is `Ok(None)`.
pub struct DepthCache<S: SensorSnapshotSource> {
    store: FrameStore<S>,
    deprojector: Deprojector,
    config: CacheConfig,
}

impl<S: SensorSnapshotSource> DepthCache<S> {
    pub fn new(source: S) -> DepthCache<S> {
        DepthCache {
            store: FrameStore::new(source),
            deprojector: Deprojector::default(),
            config: CacheConfig::default(),
        }
    }

    pub fn with_config(source: S, config: CacheConfig) -> Result<DepthCache<S>> {
        config.validate()?;
        Ok(DepthCache {
            store: FrameStore::with_eviction(source, config.eviction),
            deprojector: Deprojector::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn save_depth_frame(&mut self) -> Result<FrameHandle> {
        self.store.capture().inspect_err(|e| {
            warn!("could not save depth frame: {}", e);
        })
    }

    pub fn cam_image(&self, handle: FrameHandle) -> Result<&DynamicImage> {
        self.snapshot(handle).map(|s| s.color_image())
    }

    pub fn snapshot(&self, handle: FrameHandle) -> Result<&DepthSnapshot> {
        self.store.get(handle).inspect_err(log_lifecycle_error)
    }

    /// World position of `pixel` in the frame saved under `handle`.
    ///
    /// `Ok(None)` covers pixels outside the depth frame and pixels without a valid depth.
    pub fn world_position(
        &self,
        pixel: &PixelCoordinate,
        handle: FrameHandle,
    ) -> Result<Option<WorldPoint>> {
        let snapshot = self.snapshot(handle)?;
        Ok(self.deprojector.deproject(pixel, snapshot))
    }

    pub fn world_positions(
        &self,
        pixels: &[PixelCoordinate],
        handle: FrameHandle,
    ) -> Result<Vec<Option<WorldPoint>>> {
        let snapshot = self.snapshot(handle)?;
        Ok(self.deprojector.deproject_all(pixels, snapshot))
    }

    pub fn dispose_depth_frame(&mut self, handle: FrameHandle) -> Result<()> {
        match self.store.dispose(handle) {
            Err(CacheError::UnknownHandle(h)) if !self.config.strict_dispose => {
                debug!("ignoring dispose of unknown depth frame {}", h);
                Ok(())
            }
            r => r.inspect_err(log_lifecycle_error),
        }
    }

    pub fn live_frames(&self) -> usize {
        self.store.len()
    }

    pub fn store(&self) -> &FrameStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FrameStore<S> {
        &mut self.store
    }
}

fn log_lifecycle_error(e: &CacheError) {
    if let CacheError::UnknownHandle(h) = e {
        error!("depth frame {} used after dispose or never issued", h);
    }
}
