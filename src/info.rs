//! Per-robot dataset statistics for `print-info`

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use prettytable::{Table, format, row};
use serde::Serialize;

use crate::bag_store::TopicSummary;
use crate::error::Result;
use crate::messages::{Orientation, Point3};
use crate::nearest::nearest;
use crate::timeline::RobotTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

impl Spread {
    fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Self { mean, max, min })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InitialPose {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
    /// Roll, pitch, yaw in radians.
    pub euler_rpy: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotStats {
    pub robot: String,
    pub scans: usize,
    pub poses: usize,
    /// Pose matched to the first scan.
    pub initial_pose: Option<InitialPose>,
    pub points_mean: Option<f64>,
    pub points_std: Option<f64>,
    /// Meters between consecutive keyframe poses.
    pub keyframe_distance: Option<Spread>,
    /// Degrees between consecutive keyframe orientations.
    pub keyframe_rotation: Option<Spread>,
}

fn unit_quaternion(q: &Orientation) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn vector(p: &Point3) -> Vector3<f64> {
    Vector3::new(p.x, p.y, p.z)
}

/// Keyframes are the poses matched to each scan, in scan order.
pub fn robot_stats(timeline: &RobotTimeline) -> Result<RobotStats> {
    let scans = timeline.scans();
    let poses = timeline.poses();

    let counts: Vec<f64> = scans.iter().map(|s| s.message.point_count() as f64).collect();
    let points_mean = (!counts.is_empty()).then(|| counts.iter().sum::<f64>() / counts.len() as f64);
    let points_std = points_mean.map(|mean| {
        let var = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
        var.sqrt()
    });

    let mut stats = RobotStats {
        robot: timeline.robot_name().to_string(),
        scans: scans.len(),
        poses: poses.len(),
        initial_pose: None,
        points_mean,
        points_std,
        keyframe_distance: None,
        keyframe_rotation: None,
    };
    if poses.is_empty() || scans.is_empty() {
        return Ok(stats);
    }

    let keyframes = scans
        .iter()
        .map(|s| nearest(s.timestamp_ns, timeline.pose_stamps()).map(|i| &poses[i].message))
        .collect::<Result<Vec<_>>>()?;

    let first = keyframes[0];
    let (roll, pitch, yaw) = unit_quaternion(&first.orientation).euler_angles();
    let o = first.orientation;
    stats.initial_pose = Some(InitialPose {
        position: [first.position.x, first.position.y, first.position.z],
        orientation: [o.x, o.y, o.z, o.w],
        euler_rpy: [roll, pitch, yaw],
    });

    let distances: Vec<f64> = keyframes
        .windows(2)
        .map(|w| (vector(&w[1].position) - vector(&w[0].position)).norm())
        .collect();
    let rotations: Vec<f64> = keyframes
        .windows(2)
        .map(|w| {
            unit_quaternion(&w[0].orientation)
                .angle_to(&unit_quaternion(&w[1].orientation))
                .to_degrees()
        })
        .collect();
    stats.keyframe_distance = Spread::of(&distances);
    stats.keyframe_rotation = Spread::of(&rotations);
    Ok(stats)
}

fn opt(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}{unit}"))
}

pub fn render(stats: &RobotStats) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row![format!("Robot {}", stats.robot), ""]);

    if let Some(p) = &stats.initial_pose {
        let [x, y, z] = p.position;
        let [qx, qy, qz, qw] = p.orientation;
        let [r, pi, ya] = p.euler_rpy;
        table.add_row(row!["initial position", format!("{x:.3} {y:.3} {z:.3}")]);
        table.add_row(row!["initial orientation", format!("{qx:.3} {qy:.3} {qz:.3} {qw:.3}")]);
        table.add_row(row!["initial euler rpy", format!("{r:.3} {pi:.3} {ya:.3}")]);
    }
    table.add_row(row!["pointclouds", stats.scans]);
    table.add_row(row!["odometry messages", stats.poses]);
    table.add_row(row!["points per cloud (mean)", opt(stats.points_mean, "")]);
    table.add_row(row!["points per cloud (std)", opt(stats.points_std, "")]);

    let d = stats.keyframe_distance;
    table.add_row(row!["keyframe distance avg", opt(d.map(|s| s.mean), "m")]);
    table.add_row(row!["keyframe distance max", opt(d.map(|s| s.max), "m")]);
    table.add_row(row!["keyframe distance min", opt(d.map(|s| s.min), "m")]);
    let r = stats.keyframe_rotation;
    table.add_row(row!["keyframe rotation avg", opt(r.map(|s| s.mean), "°")]);
    table.add_row(row!["keyframe rotation max", opt(r.map(|s| s.max), "°")]);
    table.add_row(row!["keyframe rotation min", opt(r.map(|s| s.min), "°")]);

    table.to_string()
}

/// Topic table for `inspect`; times are seconds from the first record.
pub fn render_topics(path: &std::path::Path, topics: &[TopicSummary]) -> String {
    let start = topics.iter().filter_map(|t| t.first_ns).min();
    let end = topics.iter().filter_map(|t| t.last_ns).max();
    let total: u64 = topics.iter().map(|t| t.count).sum();
    let rel = |ns: Option<i64>| match (ns, start) {
        (Some(ns), Some(start)) => format!("{:.6}", (ns - start) as f64 * 1e-9),
        _ => "-".to_string(),
    };

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row!["Topic", "Type", r->"Count", r->"Start(s)", r->"End(s)"]);
    for t in topics {
        table.add_row(row![t.name, t.type_id, r->t.count, r->rel(t.first_ns), r->rel(t.last_ns)]);
    }

    let duration = match (start, end) {
        (Some(s), Some(e)) => (e - s) as f64 * 1e-9,
        _ => 0.0,
    };
    format!(
        "Log: {}\nDuration (s): {duration:.6}, Total messages: {total}\n\n{table}",
        path.display()
    )
}
