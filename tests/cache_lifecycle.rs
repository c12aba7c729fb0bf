mod common;

use std::time::{Duration, Instant};

use common::*;
use depth_frame_cache::config::{CacheConfig, EvictionPolicy};
use depth_frame_cache::{
    CacheError, CameraIntrinsics, DepthCache, FixtureSource, FrameStore, PixelCoordinate,
    StaticSource,
};
use glam::Vec2;
use nalgebra as na;

fn center() -> PixelCoordinate {
    PixelCoordinate::pixel(Vec2::new(100.0, 50.0))
}

#[test]
fn test_get_returns_captured_data_until_dispose() {
    let first = reading();
    let second = reading_with(200, 100, 7.0, na::Isometry3::translation(0.0, 1.0, 0.0));
    let mut store = FrameStore::new(FixtureSource::new([first.clone(), second.clone()]));
    let h1 = store.capture().unwrap();
    let h2 = store.capture().unwrap();
    assert_ne!(h1, h2);

    let s1 = store.get(h1).unwrap();
    assert_eq!(s1.handle(), h1);
    assert_eq!(s1.depth(), &first.depth);
    assert_eq!(s1.camera(), &first.camera);
    assert_eq!(s1.color_image().as_bytes(), first.color_image.as_bytes());
    assert_eq!(store.get(h2).unwrap().depth(), &second.depth);

    store.dispose(h1).unwrap();
    assert!(matches!(store.get(h1), Err(CacheError::UnknownHandle(h)) if h == h1));
    assert_eq!(store.get(h2).unwrap().camera(), &second.camera);
}

#[test]
fn test_everything_fails_after_dispose() {
    let mut cache = DepthCache::new(StaticSource::new(reading()));
    let h1 = cache.save_depth_frame().unwrap();
    assert!(cache.cam_image(h1).is_ok());
    cache.dispose_depth_frame(h1).unwrap();

    assert!(matches!(cache.cam_image(h1), Err(CacheError::UnknownHandle(_))));
    assert!(matches!(cache.snapshot(h1), Err(CacheError::UnknownHandle(_))));
    assert!(matches!(
        cache.world_position(&center(), h1),
        Err(CacheError::UnknownHandle(_))
    ));
    assert!(matches!(
        cache.world_positions(&[center()], h1),
        Err(CacheError::UnknownHandle(_))
    ));
    assert!(matches!(
        cache.dispose_depth_frame(h1),
        Err(CacheError::UnknownHandle(_))
    ));
}

#[test]
fn test_handles_are_never_reused() {
    let mut cache = DepthCache::new(StaticSource::new(reading()));
    let mut seen = std::collections::HashSet::new();
    for _ in 0..20 {
        let h = cache.save_depth_frame().unwrap();
        assert!(seen.insert(h), "handle {} issued twice", h);
        cache.dispose_depth_frame(h).unwrap();
    }
    assert_eq!(cache.live_frames(), 0);
}

#[test]
fn test_concurrent_handles_dispose_in_either_order() {
    for reverse in [false, true] {
        let mut cache = DepthCache::new(FixtureSource::new([
            reading(),
            reading_with(200, 100, 5.0, na::Isometry3::identity()),
        ]));
        let h1 = cache.save_depth_frame().unwrap();
        let h2 = cache.save_depth_frame().unwrap();
        assert_eq!(cache.live_frames(), 2);
        let (gone, kept, kept_z) = if reverse { (h2, h1, -2.5) } else { (h1, h2, -5.0) };

        cache.dispose_depth_frame(gone).unwrap();
        let p = cache.world_position(&center(), kept).unwrap().unwrap();
        assert_close(&p, [0.0, 0.0, kept_z]);
        assert!(cache.cam_image(kept).is_ok());
        cache.dispose_depth_frame(kept).unwrap();
        assert_eq!(cache.live_frames(), 0);
    }
}

#[test]
fn test_sensor_unavailable_allocates_nothing() {
    let mut source = FixtureSource::default();
    source.push_unavailable("depth sensor warming up");
    source.push(reading());
    let mut cache = DepthCache::new(source);

    assert!(matches!(
        cache.save_depth_frame(),
        Err(CacheError::SensorUnavailable(_))
    ));
    assert_eq!(cache.live_frames(), 0);
    let h = cache.save_depth_frame().unwrap();
    assert_eq!(cache.store().handles(), vec![h]);
    // fixtures exhausted
    assert!(matches!(
        cache.save_depth_frame(),
        Err(CacheError::SensorUnavailable(_))
    ));
}

#[test]
fn test_unusable_readings_are_rejected() {
    let mut empty_depth = reading();
    empty_depth.depth = na::DMatrix::zeros(0, 0);
    let mut bad_intrinsics = reading();
    bad_intrinsics.camera.intrinsics = CameraIntrinsics::new(0.0, 100.0, 100.0, 50.0, 200, 100);
    let mut cache = DepthCache::new(FixtureSource::new([empty_depth, bad_intrinsics]));
    for _ in 0..2 {
        assert!(matches!(
            cache.save_depth_frame(),
            Err(CacheError::SensorUnavailable(_))
        ));
    }
    assert_eq!(cache.live_frames(), 0);
}

#[test]
fn test_lenient_dispose() {
    let config = CacheConfig {
        strict_dispose: false,
        ..Default::default()
    };
    let mut cache = DepthCache::with_config(StaticSource::new(reading()), config).unwrap();
    let h = cache.save_depth_frame().unwrap();
    cache.dispose_depth_frame(h).unwrap();
    assert!(cache.dispose_depth_frame(h).is_ok());
    // reads stay strict
    assert!(matches!(cache.cam_image(h), Err(CacheError::UnknownHandle(_))));
}

#[test]
fn test_max_live_evicts_oldest() {
    let config = CacheConfig {
        eviction: EvictionPolicy {
            max_live: Some(2),
            max_age_ms: None,
        },
        ..Default::default()
    };
    let mut cache = DepthCache::with_config(StaticSource::new(reading()), config).unwrap();
    let h1 = cache.save_depth_frame().unwrap();
    let h2 = cache.save_depth_frame().unwrap();
    let h3 = cache.save_depth_frame().unwrap();
    assert_eq!(cache.live_frames(), 2);
    assert!(matches!(cache.cam_image(h1), Err(CacheError::UnknownHandle(_))));
    assert!(cache.cam_image(h2).is_ok());
    assert!(cache.cam_image(h3).is_ok());
}

#[test]
fn test_max_age_evicts_expired() {
    let policy = EvictionPolicy {
        max_live: None,
        max_age_ms: Some(1000),
    };
    let mut store = FrameStore::with_eviction(StaticSource::new(reading()), policy);
    let h1 = store.capture().unwrap();
    assert!(store.evict_expired_at(Instant::now()).is_empty());
    let evicted = store.evict_expired_at(Instant::now() + Duration::from_secs(5));
    assert_eq!(evicted, vec![h1]);
    assert!(!store.contains(h1));
    assert!(matches!(store.dispose(h1), Err(CacheError::UnknownHandle(_))));
}

#[test]
fn test_no_eviction_by_default() {
    let mut store = FrameStore::new(StaticSource::new(reading()));
    for _ in 0..50 {
        store.capture().unwrap();
    }
    assert!(store.evict_expired_at(Instant::now() + Duration::from_secs(3600)).is_empty());
    assert_eq!(store.len(), 50);
}
