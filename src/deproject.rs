use log::trace;
use nalgebra as na;
use rayon::prelude::*;

use crate::config::{CacheConfig, DepthEncoding};
use crate::frame_store::DepthSnapshot;
use crate::types::{CameraTransform, DepthBuffer, PixelCoordinate, WorldPoint};

/// Stateless pixel to world mapping.
///
/// Holds only the depth interpretation settings; every call borrows the snapshot it reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deprojector {
    pub invalid_depth_sentinel: f32,
    pub max_depth: Option<f32>,
    pub depth_encoding: DepthEncoding,
}

impl Default for Deprojector {
    fn default() -> Self {
        Deprojector::from_config(&CacheConfig::default())
    }
}

impl Deprojector {
    pub fn from_config(config: &CacheConfig) -> Deprojector {
        Deprojector {
            invalid_depth_sentinel: config.invalid_depth_sentinel,
            max_depth: config.max_depth,
            depth_encoding: config.depth_encoding,
        }
    }

    fn is_valid_depth(&self, depth: f32) -> bool {
        if !depth.is_finite() || depth <= 0.0 || depth == self.invalid_depth_sentinel {
            return false;
        }
        self.max_depth.is_none_or(|max_depth| depth <= max_depth)
    }

    pub fn deproject(
        &self,
        pixel: &PixelCoordinate,
        snapshot: &DepthSnapshot,
    ) -> Option<WorldPoint> {
        let img = snapshot.color_image();
        self.deproject_parts(
            pixel,
            (img.width(), img.height()),
            snapshot.depth(),
            snapshot.camera(),
        )
    }

    /// One result per input pixel, same order.
    pub fn deproject_all(
        &self,
        pixels: &[PixelCoordinate],
        snapshot: &DepthSnapshot,
    ) -> Vec<Option<WorldPoint>> {
        pixels
            .par_iter()
            .map(|p| self.deproject(p, snapshot))
            .collect()
    }

    /// Deprojects against loose buffers; `color_w_h` is the size `pixel` refers to.
    pub fn deproject_parts(
        &self,
        pixel: &PixelCoordinate,
        color_w_h: (u32, u32),
        depth: &DepthBuffer,
        camera: &CameraTransform,
    ) -> Option<WorldPoint> {
        let Some(uv) = pixel.to_uv(color_w_h.0, color_w_h.1) else {
            trace!("{:?} is outside the {:?} color image", pixel, color_w_h);
            return None;
        };
        let (rows, cols) = depth.shape();
        let row = (uv.y * rows as f64).floor() as usize;
        let col = (uv.x * cols as f64).floor() as usize;
        if row >= rows || col >= cols {
            return None;
        }
        let d = depth[(row, col)];
        if !self.is_valid_depth(d) {
            trace!("no valid depth at ({}, {}): {}", row, col, d);
            return None;
        }

        let ray = camera.intrinsics.ray(uv);
        let p_cam: na::Point3<f64> = match self.depth_encoding {
            DepthEncoding::RayDistance => (ray.normalize() * d as f64).into(),
            DepthEncoding::ViewZ => (ray * d as f64).into(),
        };
        Some(camera.pose.transform_point(&p_cam))
    }
}
