use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use image::DynamicImage;
use log::{debug, warn};

use crate::config::EvictionPolicy;
use crate::error::{CacheError, Result};
use crate::sensor::{SensorReading, SensorSnapshotSource};
use crate::types::{CameraTransform, DepthBuffer, FrameHandle};

/// One synchronized capture. Immutable once stored.
#[derive(Debug)]
pub struct DepthSnapshot {
    handle: FrameHandle,
    color_image: DynamicImage,
    depth: DepthBuffer,
    camera: CameraTransform,
    created_at: Instant,
}

impl DepthSnapshot {
    pub(crate) fn from_reading(
        handle: FrameHandle,
        reading: SensorReading,
        created_at: Instant,
    ) -> DepthSnapshot {
        DepthSnapshot {
            handle,
            color_image: reading.color_image,
            depth: reading.depth,
            camera: reading.camera,
            created_at,
        }
    }
    pub fn handle(&self) -> FrameHandle {
        self.handle
    }
    pub fn color_image(&self) -> &DynamicImage {
        &self.color_image
    }
    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }
    pub fn camera(&self) -> &CameraTransform {
        &self.camera
    }
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Owns live snapshots keyed by handle.
///
/// Handles come from a counter that never goes backwards, so a disposed handle value is
/// never handed out again by the same store.
pub struct FrameStore<S: SensorSnapshotSource> {
    source: S,
    snapshots: BTreeMap<FrameHandle, DepthSnapshot>,
    next_handle: u64,
    eviction: EvictionPolicy,
}

impl<S: SensorSnapshotSource> FrameStore<S> {
    pub fn new(source: S) -> FrameStore<S> {
        Self::with_eviction(source, EvictionPolicy::default())
    }

    pub fn with_eviction(source: S, eviction: EvictionPolicy) -> FrameStore<S> {
        FrameStore {
            source,
            snapshots: BTreeMap::new(),
            next_handle: 1,
            eviction,
        }
    }

    /// Reads the sensor once and stores the result under a fresh handle.
    ///
    /// No handle is allocated when the sensor cannot deliver a usable reading.
    pub fn capture(&mut self) -> Result<FrameHandle> {
        let reading = self.source.capture_now()?;
        reading.check()?;
        let now = Instant::now();
        if self.eviction.is_bounded() {
            self.evict_expired_at(now);
            self.evict_to_fit();
        }

        let handle = FrameHandle(self.next_handle);
        self.next_handle += 1;
        debug!(
            "captured depth frame {} (color {}x{}, depth {}x{})",
            handle,
            reading.color_image.width(),
            reading.color_image.height(),
            reading.depth.ncols(),
            reading.depth.nrows()
        );
        self.snapshots
            .insert(handle, DepthSnapshot::from_reading(handle, reading, now));
        Ok(handle)
    }

    pub fn get(&self, handle: FrameHandle) -> Result<&DepthSnapshot> {
        self.snapshots
            .get(&handle)
            .ok_or(CacheError::UnknownHandle(handle))
    }

    pub fn contains(&self, handle: FrameHandle) -> bool {
        self.snapshots.contains_key(&handle)
    }

    /// Removes and frees the snapshot. A second call for the same handle fails.
    pub fn dispose(&mut self, handle: FrameHandle) -> Result<()> {
        match self.snapshots.remove(&handle) {
            Some(_) => {
                debug!("disposed depth frame {}", handle);
                Ok(())
            }
            None => Err(CacheError::UnknownHandle(handle)),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Live handles, oldest first.
    pub fn handles(&self) -> Vec<FrameHandle> {
        self.snapshots.keys().copied().collect()
    }

    /// Drops snapshots older than the configured maximum age, measured at `now`.
    pub fn evict_expired_at(&mut self, now: Instant) -> Vec<FrameHandle> {
        let Some(max_age) = self.eviction.max_age() else {
            return Vec::new();
        };
        let expired: Vec<FrameHandle> = self
            .snapshots
            .values()
            .filter(|s| now.saturating_duration_since(s.created_at) > max_age)
            .map(|s| s.handle)
            .collect();
        for handle in &expired {
            self.snapshots.remove(handle);
            warn!("evicted depth frame {} after exceeding max age", handle);
        }
        expired
    }

    /// Makes room for one more snapshot under `max_live`, oldest first.
    fn evict_to_fit(&mut self) {
        let Some(max_live) = self.eviction.max_live else {
            return;
        };
        while self.snapshots.len() >= max_live {
            match self.snapshots.pop_first() {
                Some((handle, _)) => {
                    warn!(
                        "evicted depth frame {} to stay within {} live frames",
                        handle, max_live
                    );
                }
                None => break,
            }
        }
    }
}
