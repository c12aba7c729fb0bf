use std::io::Cursor;

use image::DynamicImage;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;

use crate::frame_store::DepthSnapshot;
use crate::session::PlacedLabel;
use crate::types::PixelCoordinate;

pub type VisResult = Result<(), Box<dyn std::error::Error>>;

pub fn log_image_as_png(recording: &RecordingStream, topic: &str, img: &DynamicImage) -> VisResult {
    let mut bytes: Vec<u8> = Vec::new();
    img.to_rgb8()
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    recording.log(
        format!("{}/image", topic),
        &rerun::EncodedImage::from_file_contents(bytes),
    )?;
    Ok(())
}

/// Stable color per label so the same object keeps its color across requests.
pub fn label_to_color(label: &str) -> (u8, u8, u8, u8) {
    let seed = label
        .bytes()
        .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

/// Entity path for the `index`-th replayed capture.
///
/// Handles restart at 1 in every fresh cache, so they cannot tell replayed captures apart.
pub fn replay_topic(index: usize) -> String {
    format!("/replay/{:05}", index)
}

/// Logs the cached color image with the detection pixels drawn over it at `sequence`.
pub fn log_detections(
    recording: &RecordingStream,
    topic: &str,
    sequence: i64,
    snapshot: &DepthSnapshot,
    detections: &[(String, PixelCoordinate)],
) -> VisResult {
    let img = snapshot.color_image();
    recording.set_time(
        "depth_frame",
        rerun::TimeCell::from_sequence(sequence),
    );
    log_image_as_png(recording, topic, img)?;

    let (pts, colors_labels): (Vec<_>, Vec<_>) = detections
        .iter()
        .filter_map(|(label, pixel)| {
            let uv = pixel.to_uv(img.width(), img.height())?;
            let p = (
                (uv.x * img.width() as f64) as f32,
                (uv.y * img.height() as f64) as f32,
            );
            Some((p, (label_to_color(label), label.clone())))
        })
        .unzip();
    let (colors, labels): (Vec<_>, Vec<_>) = colors_labels.into_iter().unzip();
    let pts = rerun_shift(&pts);
    recording.log(
        format!("{}/pts", topic),
        &rerun::Points2D::new(pts)
            .with_colors(colors)
            .with_labels(labels)
            .with_radii([rerun::Radius::new_ui_points(5.0)]),
    )?;
    Ok(())
}

pub fn log_world_labels(
    recording: &RecordingStream,
    topic: &str,
    labels: &[PlacedLabel],
) -> VisResult {
    let pts: Vec<[f32; 3]> = labels
        .iter()
        .map(|l| [l.world.x as f32, l.world.y as f32, l.world.z as f32])
        .collect();
    let colors: Vec<_> = labels.iter().map(|l| label_to_color(&l.label)).collect();
    let names: Vec<_> = labels.iter().map(|l| l.label.clone()).collect();
    recording.log(
        format!("{}/world", topic),
        &rerun::Points3D::new(pts)
            .with_colors(colors)
            .with_labels(names)
            .with_radii([rerun::Radius::new_ui_points(8.0)]),
    )?;
    Ok(())
}
