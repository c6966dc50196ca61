//! Ground-truth export: one `stamp x y z qx qy qz qw` line per pose

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::messages::PoseMessage;
use crate::timeline::RobotTimeline;

/// Where a robot's ground truth goes.
///
/// A `groundtruth` directory next to the dataset collects every dataset's
/// files as `<dataset>_<robot>.txt`; otherwise the file lands inside the
/// dataset under `groundtruth/<robot>_odom/stamped_groundtruth.txt`.
pub fn groundtruth_path(dataset_dir: &Path, robot: &str) -> PathBuf {
    let shared = dataset_dir.parent().map(|p| p.join("groundtruth"));
    match (shared, dataset_dir.file_name()) {
        (Some(shared), Some(name)) if shared.is_dir() => {
            shared.join(format!("{}_{robot}.txt", name.to_string_lossy()))
        }
        _ => dataset_dir
            .join("groundtruth")
            .join(format!("{robot}_odom"))
            .join("stamped_groundtruth.txt"),
    }
}

/// The header stamp, not the record time.
pub fn format_line(pose: &PoseMessage) -> String {
    let p = pose.position;
    let q = pose.orientation;
    format!(
        "{} {} {} {} {} {} {} {}",
        pose.header.stamp.as_secs_f64(),
        p.x,
        p.y,
        p.z,
        q.x,
        q.y,
        q.z,
        q.w
    )
}

pub fn write_poses(path: &Path, timeline: &RobotTimeline) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for pose in timeline.poses() {
        writeln!(out, "{}", format_line(&pose.message))?;
    }
    out.flush().with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Write every robot's poses; returns the files written, in robot order.
pub fn write_groundtruth(dataset_dir: &Path, timelines: &[RobotTimeline]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(timelines.len());
    for timeline in timelines {
        let path = groundtruth_path(dataset_dir, timeline.robot_name());
        tracing::info!("Writing ground truth odometry to {}", path.display());
        write_poses(&path, timeline)?;
        written.push(path);
    }
    Ok(written)
}
