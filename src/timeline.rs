//! Per-robot scan and pose sequences built from the dataset logs

use std::path::Path;

use rayon::prelude::*;

use crate::bag_store::{LogRecord, LogStore};
use crate::config::{PlaybackConfig, RobotFrames};
use crate::error::{BagSyncError, Result};
use crate::messages::{DecodedMessage, PoseMessage, ScanMessage, TimestampedMessage};
use crate::registry::DecoderRegistry;

/// Scans and poses of one robot, in stored order, plus its playback cursor.
///
/// The cursor only moves forward and only through [`RobotTimeline::advance`],
/// which the scheduler alone calls.
#[derive(Debug, Clone)]
pub struct RobotTimeline {
    robot_name: String,
    frames: RobotFrames,
    scans: Vec<TimestampedMessage<ScanMessage>>,
    poses: Vec<TimestampedMessage<PoseMessage>>,
    pose_stamps: Vec<i64>,
    cursor: usize,
}

impl RobotTimeline {
    pub fn new(
        robot_name: impl Into<String>,
        scans: Vec<TimestampedMessage<ScanMessage>>,
        poses: Vec<TimestampedMessage<PoseMessage>>,
    ) -> Self {
        let robot_name = robot_name.into();
        let pose_stamps = poses.iter().map(|p| p.timestamp_ns).collect();
        Self {
            frames: RobotFrames::for_robot(&robot_name),
            robot_name,
            scans,
            poses,
            pose_stamps,
            cursor: 0,
        }
    }

    pub fn with_frames(mut self, frames: RobotFrames) -> Self {
        self.frames = frames;
        self
    }

    pub fn robot_name(&self) -> &str {
        &self.robot_name
    }

    pub fn frames(&self) -> &RobotFrames {
        &self.frames
    }

    pub fn scans(&self) -> &[TimestampedMessage<ScanMessage>] {
        &self.scans
    }

    pub fn poses(&self) -> &[TimestampedMessage<PoseMessage>] {
        &self.poses
    }

    /// Effective pose timestamps, parallel to [`RobotTimeline::poses`].
    pub fn pose_stamps(&self) -> &[i64] {
        &self.pose_stamps
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.scans.len()
    }

    /// Timestamp of the next scan to emit, if any remain.
    pub fn next_scan_ts(&self) -> Option<i64> {
        self.scans.get(self.cursor).map(|s| s.timestamp_ns)
    }

    pub(crate) fn current_pair_mut(&mut self, pose_idx: usize) -> Option<(&mut ScanMessage, &mut PoseMessage)> {
        let scan = self.scans.get_mut(self.cursor)?;
        let pose = self.poses.get_mut(pose_idx)?;
        Some((&mut scan.message, &mut pose.message))
    }

    pub(crate) fn advance(&mut self) {
        if self.cursor < self.scans.len() {
            self.cursor += 1;
        }
    }
}

/// Ingest one robot's scan and pose logs.
///
/// Scans keep the container record time; poses are re-stamped from their own
/// header. Neither sequence is re-sorted.
pub fn build(
    robot_name: &str,
    scan_log_path: &Path,
    pose_log_path: &Path,
    scan_topic: &str,
    pose_topic: &str,
    registry: &DecoderRegistry,
) -> Result<RobotTimeline> {
    for path in [scan_log_path, pose_log_path] {
        if !path.exists() {
            return Err(BagSyncError::MissingLog { robot: robot_name.to_string(), path: path.to_path_buf() });
        }
    }

    tracing::info!(
        "Reading all messages from {} with topic name {scan_topic}",
        scan_log_path.display()
    );
    let scan_store = LogStore::open(scan_log_path)?;
    let scan_records = scan_store.read_all(scan_topic)?;
    scan_store.close()?;

    let scans = scan_records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            decode_scan(registry, &record)
                .map(|scan| TimestampedMessage::new(record.timestamp_ns, scan))
                .map_err(|e| e.in_record(scan_log_path, scan_topic, index))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Reading all messages from {} with topic name {pose_topic}",
        pose_log_path.display()
    );
    let pose_store = LogStore::open(pose_log_path)?;
    let pose_records = pose_store.read_all(pose_topic)?;
    pose_store.close()?;

    let poses = pose_records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            decode_pose(registry, &record)
                .map(|pose| TimestampedMessage::new(pose.stamp_ns(), pose))
                .map_err(|e| e.in_record(pose_log_path, pose_topic, index))
        })
        .collect::<Result<Vec<_>>>()?;

    if poses.is_empty() {
        tracing::warn!("robot {robot_name} has no poses on {pose_topic}; its scans cannot be matched");
    }
    tracing::info!("robot {robot_name}: {} scans, {} poses", scans.len(), poses.len());

    Ok(RobotTimeline::new(robot_name, scans, poses))
}

fn decode_scan(registry: &DecoderRegistry, record: &LogRecord) -> Result<ScanMessage> {
    match registry.decode(&record.type_id, &record.payload)? {
        DecodedMessage::Scan(scan) => Ok(scan),
        other => Err(wrong_variant(&record.type_id, "scan", &other)),
    }
}

fn decode_pose(registry: &DecoderRegistry, record: &LogRecord) -> Result<PoseMessage> {
    match registry.decode(&record.type_id, &record.payload)? {
        DecodedMessage::Pose(pose) => Ok(pose),
        other => Err(wrong_variant(&record.type_id, "pose", &other)),
    }
}

fn wrong_variant(type_id: &str, expected: &str, got: &DecodedMessage) -> BagSyncError {
    BagSyncError::DecodeError {
        type_id: type_id.to_string(),
        reason: format!("expected a {expected} message, decoded a {}", got.variant_name()),
    }
}

/// Build every configured robot's timeline in parallel, in configured order.
///
/// Fails on the first robot that cannot be ingested; a partial robot set would
/// change the merge.
pub fn load_dataset(config: &PlaybackConfig, registry: &DecoderRegistry) -> Result<Vec<RobotTimeline>> {
    config.validate()?;
    let layout = config.layout();
    config
        .robot_names
        .par_iter()
        .map(|robot| {
            tracing::info!("Setting up playback for robot: {robot}");
            build(
                robot,
                &layout.scan_log(robot),
                &layout.pose_log(robot),
                &config.scan_topic(robot),
                &config.pose_topic(robot),
                registry,
            )
            .map(|timeline| timeline.with_frames(config.frames(robot)))
            .map_err(|e| e.for_robot(robot))
        })
        .collect()
}
