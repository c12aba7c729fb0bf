#![allow(dead_code)]

use depth_frame_cache::{CameraIntrinsics, CameraTransform, SensorReading};
use image::{DynamicImage, RgbImage};
use nalgebra as na;

pub const COLOR_W: u32 = 200;
pub const COLOR_H: u32 = 100;

/// 200x100 camera with the principal point at (100, 50) and f = 100 px.
pub fn intrinsics() -> CameraIntrinsics {
    CameraIntrinsics::new(100.0, 100.0, 100.0, 50.0, COLOR_W, COLOR_H)
}

/// Flat depth of `depth` everywhere except an invalid sample at (0, 0).
pub fn reading_with(
    depth_w: usize,
    depth_h: usize,
    depth: f32,
    pose: na::Isometry3<f64>,
) -> SensorReading {
    let mut buffer = na::DMatrix::from_element(depth_h, depth_w, depth);
    buffer[(0, 0)] = 0.0;
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(COLOR_W, COLOR_H, image::Rgb([10, 20, 30])));
    SensorReading::new(img, buffer, CameraTransform::new(intrinsics(), pose))
}

pub fn reading() -> SensorReading {
    reading_with(COLOR_W as usize, COLOR_H as usize, 2.5, na::Isometry3::identity())
}

pub fn assert_close(p: &na::Point3<f64>, expected: [f64; 3]) {
    let diff = p - na::Point3::from(expected);
    assert!(diff.norm() < 1e-6, "got {:?}, expected {:?}", p, expected);
}
