use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::PlaybackConfig;

#[derive(Parser, Debug)]
#[command(
    name = "bagsync",
    about = "Replay multi-robot ROS 2 rosbag logs as one time-ordered scan/pose stream",
    version
)]
pub struct Cli {
    /// JSON configuration file; command-line flags override its values
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the dataset lives and how its logs are laid out.
#[derive(Args, Debug, Clone, Default)]
pub struct DatasetArgs {
    /// Dataset root containing rosbag/ and ground_truth/
    #[arg(long = "dataset-dir")]
    pub dataset_dir: Option<PathBuf>,
    /// Robot to replay (can be repeated)
    #[arg(long = "robot", action = ArgAction::Append)]
    pub robots: Vec<String>,
    /// Scan topic template, `{robot}` is replaced by the robot name
    #[arg(long = "scan-topic")]
    pub scan_topic: Option<String>,
    /// Pose topic template, `{robot}` is replaced by the robot name
    #[arg(long = "pose-topic")]
    pub pose_topic: Option<String>,
    /// Log container file extension
    #[arg(long = "ext")]
    pub ext: Option<String>,
}

impl DatasetArgs {
    pub fn apply(&self, config: &mut PlaybackConfig) {
        if let Some(dir) = &self.dataset_dir {
            config.dataset_dir = dir.clone();
        }
        if !self.robots.is_empty() {
            config.robot_names = self.robots.clone();
        }
        if let Some(topic) = &self.scan_topic {
            config.scan_topic_template = topic.clone();
        }
        if let Some(topic) = &self.pose_topic {
            config.pose_topic_template = topic.clone();
        }
        if let Some(ext) = &self.ext {
            config.log_extension = ext.trim_start_matches('.').to_string();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay every robot's scans with their nearest poses in global time order
    Play {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Emissions per second
        #[arg(long = "rate")]
        rate: Option<f64>,
        /// Also record the emitted stream into this .rrd file
        #[arg(long = "rrd")]
        rrd: Option<PathBuf>,
        /// Print the playback summary as JSON on stdout
        #[arg(long = "json")]
        json: bool,
        /// Hide the progress bar
        #[arg(long = "no-progress")]
        no_progress: bool,
    },

    /// Plot every robot's pose trajectory into an .rrd file
    PlotTrajectories {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Output .rrd path
        #[arg(long = "out", default_value = "trajectories.rrd")]
        out: PathBuf,
    },

    /// Print pose, point-cloud and keyframe statistics per robot
    PrintInfo {
        #[command(flatten)]
        dataset: DatasetArgs,
    },

    /// Write each robot's poses as `stamp x y z qx qy qz qw` text files
    WriteGroundtruth {
        #[command(flatten)]
        dataset: DatasetArgs,
    },

    /// List topics, types, message counts and time span of one log container
    Inspect {
        /// Path to the .db3 file
        bag: PathBuf,
    },
}

/// Defaults, then the config file, then command-line flags.
pub fn resolve_config(
    config_file: Option<&Path>,
    dataset: &DatasetArgs,
    rate: Option<f64>,
) -> anyhow::Result<PlaybackConfig> {
    let mut config = match config_file {
        Some(path) => PlaybackConfig::from_json_file(path)?,
        None => PlaybackConfig::default(),
    };
    dataset.apply(&mut config);
    if let Some(rate) = rate {
        config.rate = rate;
    }
    config.validate()?;
    Ok(config)
}
