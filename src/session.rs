//! Request cycle around the cache: capture, ask an external detector, place the results.
//!
//! The detector answers through a [`ReplySender`] whenever it likes and from any thread.
//! Answers queue up until [`SceneController::pump`] runs them on the owning thread, so the
//! cache is only ever touched from one place.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use image::DynamicImage;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::depth_cache::DepthCache;
use crate::error::Result;
use crate::sensor::SensorSnapshotSource;
use crate::types::{FrameHandle, PixelCoordinate, WorldPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// One labelled pixel returned by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPoint {
    pub label: String,
    pub pixel: PixelCoordinate,
    #[serde(default)]
    pub show_arrow: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub message: String,
    pub points: Vec<DetectionPoint>,
}

struct Completion {
    request: RequestId,
    result: std::result::Result<DetectionResponse, String>,
}

/// Delivers exactly one answer for one request.
pub struct ReplySender {
    request: RequestId,
    tx: Sender<Completion>,
}

impl ReplySender {
    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn send(self, result: std::result::Result<DetectionResponse, String>) {
        let request = self.request;
        if self.tx.send(Completion { request, result }).is_err() {
            debug!("{} answered after the scene controller was dropped", request);
        }
    }
}

/// External detector that looks at an image and answers later.
pub trait DetectionPipeline {
    fn submit(&mut self, image: &DynamicImage, prompt: &str, reply: ReplySender);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub label: String,
    pub world: WorldPoint,
    pub show_arrow: bool,
}

/// What the scene should show once a request has been answered.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUpdate {
    pub request: RequestId,
    pub message: String,
    pub labels: Vec<PlacedLabel>,
    /// First detection that resolved to a world position.
    pub target: Option<PlacedLabel>,
    /// Labels whose pixel was outside the depth frame or had no valid depth.
    pub unresolved: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Submitted {
        request: RequestId,
        handle: FrameHandle,
    },
    /// A request is already in flight; nothing was captured.
    Busy,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    request: RequestId,
    handle: FrameHandle,
}

pub struct SceneController<S: SensorSnapshotSource, P: DetectionPipeline> {
    cache: DepthCache<S>,
    pipeline: P,
    in_flight: Option<InFlight>,
    next_request: u64,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl<S: SensorSnapshotSource, P: DetectionPipeline> SceneController<S, P> {
    pub fn new(cache: DepthCache<S>, pipeline: P) -> SceneController<S, P> {
        let (tx, rx) = mpsc::channel();
        SceneController {
            cache,
            pipeline,
            in_flight: None,
            next_request: 1,
            tx,
            rx,
        }
    }

    pub fn is_request_running(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn cache(&self) -> &DepthCache<S> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut DepthCache<S> {
        &mut self.cache
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    /// Starts a request for a finished utterance.
    pub fn on_speech(&mut self, text: &str) -> Result<RequestOutcome> {
        if let Some(in_flight) = self.in_flight {
            warn!("{} still running, ignoring \"{}\"", in_flight.request, text);
            return Ok(RequestOutcome::Busy);
        }
        let handle = self.cache.save_depth_frame()?;
        let request = RequestId(self.next_request);
        self.next_request += 1;
        let reply = ReplySender {
            request,
            tx: self.tx.clone(),
        };
        let image = self.cache.cam_image(handle)?;
        self.pipeline.submit(image, text, reply);
        self.in_flight = Some(InFlight { request, handle });
        info!("{} submitted with depth frame {}", request, handle);
        Ok(RequestOutcome::Submitted { request, handle })
    }

    /// Runs every answer that arrived since the last call, in arrival order.
    pub fn pump(&mut self) -> Vec<SceneUpdate> {
        let mut updates = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            if let Some(update) = self.complete(completion) {
                updates.push(update);
            }
        }
        updates
    }

    /// Gives up on the running request and frees its frame. A late answer is dropped.
    pub fn abandon(&mut self) -> Option<RequestId> {
        let in_flight = self.in_flight.take()?;
        info!("abandoning {}", in_flight.request);
        if let Err(e) = self.cache.dispose_depth_frame(in_flight.handle) {
            error!("could not dispose frame of {}: {}", in_flight.request, e);
        }
        Some(in_flight.request)
    }

    fn complete(&mut self, completion: Completion) -> Option<SceneUpdate> {
        let in_flight = match self.in_flight {
            Some(f) if f.request == completion.request => f,
            _ => {
                warn!("dropping answer for stale {}", completion.request);
                return None;
            }
        };
        self.in_flight = None;

        let update = match completion.result {
            Ok(response) => self.place(in_flight, response),
            Err(reason) => {
                warn!("{} failed: {}", in_flight.request, reason);
                SceneUpdate {
                    request: in_flight.request,
                    message: String::new(),
                    labels: Vec::new(),
                    target: None,
                    unresolved: Vec::new(),
                    error: Some(reason),
                }
            }
        };
        if let Err(e) = self.cache.dispose_depth_frame(in_flight.handle) {
            error!("could not dispose frame of {}: {}", in_flight.request, e);
        }
        Some(update)
    }

    fn place(&self, in_flight: InFlight, response: DetectionResponse) -> SceneUpdate {
        info!(
            "{} answered with {} points",
            in_flight.request,
            response.points.len()
        );
        let pixels: Vec<PixelCoordinate> = response.points.iter().map(|p| p.pixel).collect();
        let (positions, error) = match self.cache.world_positions(&pixels, in_flight.handle) {
            Ok(positions) => (positions, None),
            Err(e) => (vec![None; pixels.len()], Some(e.to_string())),
        };

        let mut labels = Vec::new();
        let mut unresolved = Vec::new();
        for (i, (point, world)) in response.points.into_iter().zip(positions).enumerate() {
            match world {
                Some(world) => {
                    info!(
                        "detection {}: \"{}\" at ({:.3}, {:.3}, {:.3})",
                        i + 1,
                        point.label,
                        world.x,
                        world.y,
                        world.z
                    );
                    labels.push(PlacedLabel {
                        label: point.label,
                        world,
                        show_arrow: point.show_arrow,
                    });
                }
                None => {
                    info!("detection {}: \"{}\" has no world position", i + 1, point.label);
                    unresolved.push(point.label);
                }
            }
        }
        SceneUpdate {
            request: in_flight.request,
            message: response.message,
            target: labels.first().cloned(),
            labels,
            unresolved,
            error,
        }
    }
}
