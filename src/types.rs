use std::fmt;

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Opaque identifier of one cached snapshot.
///
/// Handles are non-negative and unique for the lifetime of the store that issued them.
/// Nothing beyond equality should be read into the numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameHandle(pub(crate) u64);

impl FrameHandle {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-pixel depth samples, `(row, col)` indexed.
pub type DepthBuffer = na::DMatrix<f32>;

/// Deprojected point in the world frame.
pub type WorldPoint = na::Point3<f64>;

/// A 2D location inside the color image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PixelCoordinate {
    /// Pixel units of the color image.
    Pixel { x: f32, y: f32 },
    /// Fraction of the color image size, `0..1` on both axes.
    Normalized { u: f32, v: f32 },
}

impl PixelCoordinate {
    pub fn pixel(p: glam::Vec2) -> PixelCoordinate {
        PixelCoordinate::Pixel { x: p.x, y: p.y }
    }
    pub fn normalized(p: glam::Vec2) -> PixelCoordinate {
        PixelCoordinate::Normalized { u: p.x, v: p.y }
    }

    /// Normalized `(u, v)` against a `width x height` image, or `None` when outside `[0, 1)`.
    pub fn to_uv(&self, width: u32, height: u32) -> Option<glam::DVec2> {
        let uv = match *self {
            PixelCoordinate::Pixel { x, y } => {
                if width == 0 || height == 0 {
                    return None;
                }
                glam::DVec2::new(x as f64 / width as f64, y as f64 / height as f64)
            }
            PixelCoordinate::Normalized { u, v } => glam::DVec2::new(u as f64, v as f64),
        };
        if !uv.is_finite() || uv.x < 0.0 || uv.y < 0.0 || uv.x >= 1.0 || uv.y >= 1.0 {
            None
        } else {
            Some(uv)
        }
    }
}

/// Pinhole intrinsics at a stated resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> CameraIntrinsics {
        CameraIntrinsics {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Intrinsics with the principal point at the image center and the given horizontal fov.
    pub fn from_hfov(hfov_rad: f64, width: u32, height: u32) -> CameraIntrinsics {
        let f = width as f64 / 2.0 / (hfov_rad / 2.0).tan();
        CameraIntrinsics::new(f, f, width as f64 / 2.0, height as f64 / 2.0, width, height)
    }

    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
            && self.width > 0
            && self.height > 0
    }

    /// Camera-space ray through a normalized image location.
    ///
    /// Camera looks down -Z with +Y up; image rows grow downward.
    pub fn ray(&self, uv: glam::DVec2) -> na::Vector3<f64> {
        let px = uv.x * self.width as f64;
        let py = uv.y * self.height as f64;
        na::Vector3::new((px - self.cx) / self.fx, -(py - self.cy) / self.fy, -1.0)
    }
}

/// Intrinsics plus camera-to-world pose, both valid at capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransform {
    pub intrinsics: CameraIntrinsics,
    pub pose: na::Isometry3<f64>,
}

impl CameraTransform {
    pub fn new(intrinsics: CameraIntrinsics, pose: na::Isometry3<f64>) -> CameraTransform {
        CameraTransform { intrinsics, pose }
    }
}

/// Axis-angle rotation and translation, the on-disk form of a pose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RvecTvec {
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
}

impl RvecTvec {
    pub fn new(rvec: &[f64; 3], tvec: &[f64; 3]) -> RvecTvec {
        RvecTvec {
            rvec: *rvec,
            tvec: *tvec,
        }
    }
    pub fn na_rvec(&self) -> na::Vector3<f64> {
        na::Vector3::from(self.rvec)
    }
    pub fn na_tvec(&self) -> na::Vector3<f64> {
        na::Vector3::from(self.tvec)
    }
    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(self.na_tvec(), self.na_rvec())
    }
}

pub trait ToRvecTvec {
    fn to_rvec_tvec(&self) -> RvecTvec;
}

impl ToRvecTvec for na::Isometry3<f64> {
    fn to_rvec_tvec(&self) -> RvecTvec {
        let rvec = self.rotation.scaled_axis();
        let tvec = self.translation.vector;
        RvecTvec::new(&[rvec.x, rvec.y, rvec.z], &[tvec.x, tvec.y, tvec.z])
    }
}
