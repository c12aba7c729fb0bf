use depth_frame_cache::session::{
    DetectionPipeline, DetectionPoint, DetectionResponse, ReplySender, RequestOutcome,
    SceneController,
};
use depth_frame_cache::{
    CameraIntrinsics, CameraTransform, DepthCache, FixtureSource, PixelCoordinate, SensorReading,
};
use glam::Vec2;
use image::DynamicImage;
use nalgebra as na;
use std::time::Duration;

/// Answers from a worker thread after a delay, like a remote model would.
struct SlowDetector;

impl DetectionPipeline for SlowDetector {
    fn submit(&mut self, image: &DynamicImage, prompt: &str, reply: ReplySender) {
        println!("asking \"{}\" about a {}x{} frame", prompt, image.width(), image.height());
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            reply.send(Ok(DetectionResponse {
                message: "I can see a chair and a window.".to_string(),
                points: vec![
                    DetectionPoint {
                        label: "chair".to_string(),
                        pixel: PixelCoordinate::normalized(Vec2::new(0.4, 0.7)),
                        show_arrow: true,
                    },
                    DetectionPoint {
                        label: "window".to_string(),
                        pixel: PixelCoordinate::normalized(Vec2::new(0.8, 0.1)),
                        show_arrow: false,
                    },
                ],
            }));
        });
    }
}

fn room_reading(yaw: f64) -> SensorReading {
    // floor gets closer toward the bottom rows, the top band has no depth
    let depth = na::DMatrix::from_fn(120, 160, |r, _| if r < 24 { 0.0 } else { 6.0 - r as f32 * 0.03 });
    let pose = na::Isometry3::new(na::Vector3::new(0.0, 1.6, 0.0), na::Vector3::new(0.0, yaw, 0.0));
    SensorReading::new(
        DynamicImage::new_rgb8(640, 480),
        depth,
        CameraTransform::new(CameraIntrinsics::from_hfov(1.1, 640, 480), pose),
    )
}

fn main() {
    env_logger::init();
    let source = FixtureSource::new([room_reading(0.0), room_reading(0.3)]);
    let mut scene = SceneController::new(DepthCache::new(source), SlowDetector);

    for utterance in ["what is in this room?", "and now?"] {
        match scene.on_speech(utterance) {
            Ok(RequestOutcome::Submitted { request, handle }) => {
                println!("{} uses depth frame {}", request, handle)
            }
            Ok(RequestOutcome::Busy) => continue,
            Err(e) => {
                println!("capture failed: {}", e);
                continue;
            }
        }
        // scene loop
        loop {
            let updates = scene.pump();
            for update in &updates {
                println!("{}: {}", update.request, update.message);
                for l in &update.labels {
                    println!("    {} at ({:.3}, {:.3}, {:.3})", l.label, l.world.x, l.world.y, l.world.z);
                }
                for l in &update.unresolved {
                    println!("    {} has no depth", l);
                }
            }
            if !updates.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(16));
        }
    }
}
