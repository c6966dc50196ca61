//! Rerun output: live playback sink and trajectory plots

use std::path::Path;

use anyhow::{Context, Result};
use nalgebra::Point3;

use crate::messages::pointcloud::xyz_points;
use crate::messages::{PoseMessage, ScanMessage};
use crate::publisher::{Publisher, pose_output_topic, scan_output_topic};
use crate::timeline::RobotTimeline;

pub const APP_ID: &str = "bagsync";
pub const TIMELINE: &str = "ros_time";

/// Label height above the trajectory, in meters.
const LABEL_Z_OFFSET: f32 = 0.05;
const MARKER_STEPS: usize = 20;

// tableau10
const PALETTE: [(u8, u8, u8); 10] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

pub fn robot_color(index: usize) -> rerun::Color {
    let (r, g, b) = PALETTE[index % PALETTE.len()];
    rerun::Color::from_rgb(r, g, b)
}

pub fn save_recording(path: &Path) -> Result<rerun::RecordingStream> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    rerun::RecordingStreamBuilder::new(APP_ID)
        .save(path)
        .with_context(|| format!("failed to open recording {}", path.display()))
}

/// Mirrors the emitted stream into a Rerun recording on the `ros_time` timeline.
pub struct RerunPublisher {
    rec: rerun::RecordingStream,
}

impl RerunPublisher {
    pub fn new(rec: rerun::RecordingStream) -> Self {
        Self { rec }
    }

    pub fn save(path: &Path) -> Result<Self> {
        Ok(Self::new(save_recording(path)?))
    }

    pub fn recording(&self) -> &rerun::RecordingStream {
        &self.rec
    }
}

impl Publisher for RerunPublisher {
    fn publish_clock(&mut self, timestamp_ns: i64) {
        self.rec.set_timestamp_secs_since_epoch(TIMELINE, timestamp_ns as f64 * 1e-9);
    }

    fn publish_scan(&mut self, robot: &str, scan: &ScanMessage) {
        let points = rerun::archetypes::Points3D::new(xyz_points(scan));
        if let Err(e) = self.rec.log(scan_output_topic(robot), &points) {
            tracing::warn!("failed to log scan of {robot}: {e}");
        }
    }

    fn publish_pose(&mut self, robot: &str, pose: &PoseMessage) {
        let p = pose.position;
        let q = pose.orientation;
        let transform = rerun::archetypes::Transform3D::from_translation_rotation(
            [p.x as f32, p.y as f32, p.z as f32],
            rerun::datatypes::Quaternion::from_xyzw([q.x as f32, q.y as f32, q.z as f32, q.w as f32]),
        );
        if let Err(e) = self.rec.log(pose_output_topic(robot), &transform) {
            tracing::warn!("failed to log pose of {robot}: {e}");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub index: usize,
    pub label: String,
}

/// "start", "end" and a label every 5% of travelled distance.
///
/// Each percentage marker sits on the sample whose cumulative distance is
/// closest to the target; the first such sample wins.
pub fn trajectory_markers(points: &[Point3<f64>]) -> Vec<Marker> {
    let Some(last) = points.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut travelled = Vec::with_capacity(points.len());
    let mut total = 0.0;
    travelled.push(0.0);
    for pair in points.windows(2) {
        total += nalgebra::distance(&pair[0], &pair[1]);
        travelled.push(total);
    }

    let mut markers = vec![Marker { index: 0, label: "start".into() }];
    if total > 0.0 {
        for step in 1..MARKER_STEPS {
            let target = total * step as f64 / MARKER_STEPS as f64;
            let mut best = 0;
            for (i, d) in travelled.iter().enumerate() {
                if (d - target).abs() < (travelled[best] - target).abs() {
                    best = i;
                }
            }
            markers.push(Marker { index: best, label: format!("{}%", step * 100 / MARKER_STEPS) });
        }
    }
    markers.push(Marker { index: last, label: "end".into() });
    markers
}

fn pose_positions(timeline: &RobotTimeline) -> Vec<Point3<f64>> {
    timeline
        .poses()
        .iter()
        .map(|p| {
            let pos = p.message.position;
            Point3::new(pos.x, pos.y, pos.z)
        })
        .collect()
}

/// Log every robot's pose track as a colored line strip with distance markers.
pub fn log_trajectories(rec: &rerun::RecordingStream, timelines: &[RobotTimeline]) -> Result<()> {
    for (i, timeline) in timelines.iter().enumerate() {
        let robot = timeline.robot_name();
        let positions = pose_positions(timeline);
        if positions.is_empty() {
            tracing::warn!("robot {robot} has no poses, skipping its trajectory");
            continue;
        }
        let color = robot_color(i);
        let strip: Vec<[f32; 3]> = positions.iter().map(|p| [p.x as f32, p.y as f32, p.z as f32]).collect();

        rec.log_static(
            format!("/trajectories/{robot}/path"),
            &rerun::archetypes::LineStrips3D::new([strip.clone()])
                .with_colors([color])
                .with_labels([robot.to_string()]),
        )?;

        let markers = trajectory_markers(&positions);
        let marker_points = markers.iter().map(|m| {
            let [x, y, z] = strip[m.index];
            [x, y, z + LABEL_Z_OFFSET]
        });
        rec.log_static(
            format!("/trajectories/{robot}/markers"),
            &rerun::archetypes::Points3D::new(marker_points)
                .with_colors([color])
                .with_labels(markers.iter().map(|m| m.label.clone())),
        )?;
        tracing::info!("robot {robot}: logged trajectory with {} poses", positions.len());
    }
    Ok(())
}

pub fn plot_trajectories(timelines: &[RobotTimeline], out: &Path) -> Result<()> {
    let rec = save_recording(out)?;
    log_trajectories(&rec, timelines)?;
    tracing::info!("Wrote trajectories to {}", out.display());
    Ok(())
}
