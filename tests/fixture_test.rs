use depth_frame_cache::config::CacheConfig;
use depth_frame_cache::fixture::{CaptureFixture, ReplayReport, replay_fixture, replay_fixture_with};
use depth_frame_cache::io::{object_from_json, object_to_json};
use depth_frame_cache::session::DetectionPoint;
use depth_frame_cache::visualization::replay_topic;
use depth_frame_cache::types::{CameraIntrinsics, PixelCoordinate, RvecTvec};
use depth_frame_cache::CacheError;
use glam::Vec2;

fn fixture() -> CaptureFixture {
    let mut depth = vec![3.0f32; 8 * 4];
    depth[0] = 0.0;
    CaptureFixture {
        name: "desk".to_string(),
        image_path: None,
        color_w_h: (16, 8),
        depth_w_h: (8, 4),
        depth,
        intrinsics: CameraIntrinsics::new(8.0, 8.0, 8.0, 4.0, 16, 8),
        pose: RvecTvec::new(&[0.0, 0.0, 0.0], &[0.0, 1.5, 0.0]),
        detections: vec![
            DetectionPoint {
                label: "lamp".to_string(),
                pixel: PixelCoordinate::pixel(Vec2::new(8.0, 4.0)),
                show_arrow: false,
            },
            DetectionPoint {
                label: "corner".to_string(),
                pixel: PixelCoordinate::normalized(Vec2::new(0.01, 0.01)),
                show_arrow: false,
            },
        ],
    }
}

#[test]
fn test_replay_fixture() {
    let record = replay_fixture(&fixture(), &CacheConfig::default()).unwrap();
    assert_eq!(record.name, "desk");
    assert_eq!(record.detections.len(), 2);
    let [x, y, z] = record.detections[0].world.unwrap();
    assert!(x.abs() < 1e-9 && (y - 1.5).abs() < 1e-9 && (z + 3.0).abs() < 1e-9);
    assert!(record.detections[1].world.is_none());
    assert_eq!(record.resolved(), 1);

    let report = ReplayReport::new(vec![record.clone(), record]);
    assert_eq!(report.fixtures, 2);
    assert_eq!(report.resolved, 2);
    assert_eq!(report.unresolved, 2);
}

#[test]
fn test_inspect_sees_live_snapshot() {
    let mut seen = None;
    replay_fixture_with(&fixture(), &CacheConfig::default(), |snapshot, record| {
        seen = Some((snapshot.color_image().width(), snapshot.depth().ncols(), record.resolved()));
    })
    .unwrap();
    assert_eq!(seen, Some((16, 8, 1)));
}

#[test]
fn test_depth_length_mismatch() {
    let mut f = fixture();
    f.depth.pop();
    assert!(matches!(f.to_reading(), Err(CacheError::FixtureMismatch(_))));
    assert!(replay_fixture(&f, &CacheConfig::default()).is_err());
}

#[test]
fn test_fixture_json_roundtrip_and_image_path() {
    let dir = tempfile::tempdir().unwrap();
    let img_path = dir.path().join("frame.png");
    image::RgbImage::new(16, 8).save(&img_path).unwrap();

    let mut f = fixture();
    f.image_path = Some(img_path.to_str().unwrap().to_string());
    let json_path = dir.path().join("desk.json");
    let json_path = json_path.to_str().unwrap();
    object_to_json(json_path, &f).unwrap();

    let loaded: CaptureFixture = object_from_json(json_path).unwrap();
    let reading = loaded.to_reading().unwrap();
    assert_eq!(reading.color_image.width(), 16);
    assert_eq!(reading.depth.nrows(), 4);

    f.color_w_h = (32, 8);
    assert!(matches!(f.to_reading(), Err(CacheError::FixtureMismatch(_))));
}

#[test]
fn test_oversized_depth_dimensions() {
    let mut f = fixture();
    f.depth_w_h = (65536, 65536);
    f.depth = Vec::new();
    assert!(matches!(f.to_reading(), Err(CacheError::FixtureMismatch(_))));

    f.depth_w_h = (u32::MAX, u32::MAX);
    assert!(matches!(f.to_reading(), Err(CacheError::FixtureMismatch(_))));
    assert!(replay_fixture(&f, &CacheConfig::default()).is_err());
}

#[test]
fn test_replayed_fixtures_log_to_distinct_topics() {
    let mut logged = Vec::new();
    for (index, name) in ["a", "b", "c"].iter().enumerate() {
        let mut f = fixture();
        f.name = name.to_string();
        replay_fixture_with(&f, &CacheConfig::default(), |snapshot, record| {
            logged.push((snapshot.handle(), replay_topic(index), record.name.clone()));
        })
        .unwrap();
    }
    // every replay runs in a fresh cache, so handles repeat
    assert!(logged.iter().all(|(h, _, _)| *h == logged[0].0));
    let topics: Vec<_> = logged.iter().map(|(_, t, _)| t.clone()).collect();
    assert_ne!(topics[0], topics[1]);
    assert_ne!(topics[1], topics[2]);
    assert_ne!(topics[0], topics[2]);
}
