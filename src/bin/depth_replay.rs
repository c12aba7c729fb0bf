use clap::Parser;
use depth_frame_cache::config::CacheConfig;
use depth_frame_cache::fixture::{CaptureFixture, ReplayRecord, ReplayReport, replay_fixture_with};
use depth_frame_cache::io::{object_from_json, object_to_json};
use depth_frame_cache::session::PlacedLabel;
use depth_frame_cache::visualization::{log_detections, log_world_labels, replay_topic};
use glob::glob;
use indicatif::ParallelProgressIterator;
use nalgebra as na;
use rayon::prelude::*;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct DepthReplayCli {
    /// glob of capture fixture json files
    pattern: String,

    /// cache config json
    #[arg(short, long)]
    config: Option<String>,

    /// where to write the replay report
    #[arg(short, long, default_value = "replay_report.json")]
    report: String,

    /// save a rerun recording to this path
    #[arg(long)]
    rrd: Option<String>,
}

fn placed_labels(record: &ReplayRecord) -> Vec<PlacedLabel> {
    record
        .detections
        .iter()
        .filter_map(|d| {
            d.world.map(|w| PlacedLabel {
                label: d.label.clone(),
                world: na::Point3::from(w),
                show_arrow: false,
            })
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = DepthReplayCli::parse();
    let config = match &cli.config {
        Some(path) => CacheConfig::from_json_file(path)?,
        None => CacheConfig::default(),
    };
    let recording = match &cli.rrd {
        Some(path) => Some(rerun::RecordingStreamBuilder::new("depth_replay").save(path)?),
        None => None,
    };

    let mut paths: Vec<String> = glob(&cli.pattern)?
        .filter_map(|p| p.ok())
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    paths.sort();
    log::info!("replaying {} fixtures", paths.len());

    let now = Instant::now();
    let records: Vec<ReplayRecord> = paths
        .par_iter()
        .enumerate()
        .progress_count(paths.len() as u64)
        .filter_map(|(index, path)| {
            let mut fixture: CaptureFixture = match object_from_json(path) {
                Ok(f) => f,
                Err(e) => {
                    log::error!("skipping {}: {}", path, e);
                    return None;
                }
            };
            if fixture.name.is_empty() {
                fixture.name = path.clone();
            }
            let result = replay_fixture_with(&fixture, &config, |snapshot, record| {
                if let Some(recording) = &recording {
                    let topic = replay_topic(index);
                    let detections: Vec<_> = fixture
                        .detections
                        .iter()
                        .map(|d| (d.label.clone(), d.pixel))
                        .collect();
                    let logged =
                        log_detections(recording, &topic, index as i64, snapshot, &detections)
                            .and_then(|_| {
                                log_world_labels(recording, &topic, &placed_labels(record))
                            });
                    if let Err(e) = logged {
                        log::warn!("could not log {}: {}", path, e);
                    }
                }
            });
            match result {
                Ok(record) => Some(record),
                Err(e) => {
                    log::error!("skipping {}: {}", path, e);
                    None
                }
            }
        })
        .collect();
    let duration_sec = now.elapsed().as_secs_f64();
    println!("replay took {:.6} sec", duration_sec);

    for record in &records {
        println!("{}:", record.name);
        for d in &record.detections {
            match d.world {
                Some([x, y, z]) => println!("    {}: ({:.3}, {:.3}, {:.3})", d.label, x, y, z),
                None => println!("    {}: no world position", d.label),
            }
        }
    }
    let report = ReplayReport::new(records);
    println!(
        "resolved {} of {} detections",
        report.resolved,
        report.resolved + report.unresolved
    );
    object_to_json(&cli.report, &report)?;
    Ok(())
}
