//! Playback configuration and dataset layout

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BagSyncError, Result};

pub const ROBOT_PLACEHOLDER: &str = "{robot}";

/// Period between ticks at `rate` Hz. The rate must be positive and slow enough
/// that one period still fits in a [`Duration`].
pub fn tick_interval(rate: f64) -> Result<Duration> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(BagSyncError::ConfigInvalid(format!("rate must be a positive number, got {rate}")));
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .map_err(|e| BagSyncError::ConfigInvalid(format!("rate {rate} gives an unusable tick interval: {e}")))
}

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").expect("valid placeholder regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Ticks per second; each tick emits at most one scan/pose pair.
    pub rate: f64,
    pub robot_names: Vec<String>,
    pub dataset_dir: PathBuf,
    pub scan_topic_template: String,
    pub pose_topic_template: String,
    /// Frame assigned to scans recorded without one.
    pub scan_frame_template: String,
    /// Child frame forced onto every emitted pose.
    pub pose_child_frame_template: String,
    pub log_extension: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            robot_names: vec!["husky1".to_string()],
            dataset_dir: PathBuf::new(),
            scan_topic_template: "/{robot}/lamp/keyed_scans".to_string(),
            pose_topic_template: "/{robot}/lo_frontend/odometry".to_string(),
            scan_frame_template: "{robot}/sensor".to_string(),
            pose_child_frame_template: "{robot}/base".to_string(),
            log_extension: "db3".to_string(),
        }
    }
}

impl PlaybackConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.dataset_dir.as_os_str().is_empty() {
            return Err(BagSyncError::ConfigInvalid(
                "dataset_dir is required (pass --dataset-dir /path/to/dataset)".into(),
            ));
        }
        tick_interval(self.rate)?;
        if self.robot_names.is_empty() {
            return Err(BagSyncError::ConfigInvalid("at least one robot name is required".into()));
        }
        let mut seen = HashSet::new();
        for name in &self.robot_names {
            if name.is_empty() || name.contains('/') {
                return Err(BagSyncError::ConfigInvalid(format!("invalid robot name {name:?}")));
            }
            if !seen.insert(name.as_str()) {
                return Err(BagSyncError::ConfigInvalid(format!("robot {name} listed twice")));
            }
        }
        if self.log_extension.is_empty() {
            return Err(BagSyncError::ConfigInvalid("log_extension must not be empty".into()));
        }
        for (field, template) in [
            ("scan_topic_template", &self.scan_topic_template),
            ("pose_topic_template", &self.pose_topic_template),
            ("scan_frame_template", &self.scan_frame_template),
            ("pose_child_frame_template", &self.pose_child_frame_template),
        ] {
            check_template(field, template)?;
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Result<Duration> {
        tick_interval(self.rate)
    }

    pub fn scan_topic(&self, robot: &str) -> String {
        render(&self.scan_topic_template, robot)
    }

    pub fn pose_topic(&self, robot: &str) -> String {
        render(&self.pose_topic_template, robot)
    }

    pub fn frames(&self, robot: &str) -> RobotFrames {
        RobotFrames {
            scan_frame: render(&self.scan_frame_template, robot),
            pose_child_frame: render(&self.pose_child_frame_template, robot),
        }
    }

    pub fn layout(&self) -> DatasetLayout<'_> {
        DatasetLayout { root: &self.dataset_dir, extension: &self.log_extension }
    }
}

/// Default frame ids applied when a robot's messages are emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotFrames {
    pub scan_frame: String,
    pub pose_child_frame: String,
}

impl RobotFrames {
    pub fn for_robot(robot: &str) -> Self {
        PlaybackConfig::default().frames(robot)
    }
}

/// `<root>/rosbag/<robot>/<robot>.<ext>` and `<root>/ground_truth/<robot>_odom/<robot>_odom.<ext>`
#[derive(Debug, Clone, Copy)]
pub struct DatasetLayout<'a> {
    pub root: &'a Path,
    pub extension: &'a str,
}

impl DatasetLayout<'_> {
    pub fn scan_log(&self, robot: &str) -> PathBuf {
        self.root
            .join("rosbag")
            .join(robot)
            .join(format!("{robot}.{}", self.extension))
    }

    pub fn pose_log(&self, robot: &str) -> PathBuf {
        let stem = format!("{robot}_odom");
        self.root
            .join("ground_truth")
            .join(&stem)
            .join(format!("{stem}.{}", self.extension))
    }
}

fn render(template: &str, robot: &str) -> String {
    template.replace(ROBOT_PLACEHOLDER, robot)
}

fn check_template(field: &str, template: &str) -> Result<()> {
    if template.is_empty() {
        return Err(BagSyncError::ConfigInvalid(format!("{field} must not be empty")));
    }
    if let Some(cap) = PLACEHOLDER_RE.captures_iter(template).find(|c| &c[1] != "robot") {
        return Err(BagSyncError::ConfigInvalid(format!(
            "{field}: unknown placeholder {} in {template:?}",
            &cap[0]
        )));
    }
    Ok(())
}
