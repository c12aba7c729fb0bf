//! Depth frame cache: keep a synchronized color/depth/camera capture alive under a handle
//! while a slow detector works on the image, then map the pixels it returns into world space.

pub mod config;
pub mod depth_cache;
pub mod deproject;
pub mod error;
pub mod fixture;
pub mod frame_store;
pub mod io;
pub mod sensor;
pub mod session;
pub mod types;
pub mod visualization;

pub use config::{CacheConfig, DepthEncoding, EvictionPolicy};
pub use depth_cache::DepthCache;
pub use deproject::Deprojector;
pub use error::{CacheError, Result};
pub use frame_store::{DepthSnapshot, FrameStore};
pub use sensor::{FixtureSource, SensorReading, SensorSnapshotSource, StaticSource};
pub use types::{
    CameraIntrinsics, CameraTransform, DepthBuffer, FrameHandle, PixelCoordinate, WorldPoint,
};
