//! Synthetic rosbag2 datasets for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use bagsync::messages::{Header, Point3, Time, odometry, pointcloud};
use bagsync::registry::{KEYED_SCAN, ODOMETRY};
use bagsync::{BagWriter, PlaybackConfig, PoseMessage};
use tempfile::TempDir;

pub struct RobotData {
    pub name: String,
    /// Container record times of the scans.
    pub scans: Vec<i64>,
    /// Header stamp and x position of each pose.
    pub poses: Vec<(i64, f64)>,
}

pub struct DatasetBuilder {
    robots: Vec<RobotData>,
    nested: bool,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self { robots: Vec::new(), nested: false }
    }

    pub fn robot(mut self, name: &str, scans: &[i64], poses: &[(i64, f64)]) -> Self {
        self.robots.push(RobotData { name: name.to_string(), scans: scans.to_vec(), poses: poses.to_vec() });
        self
    }

    /// Put the dataset under `<tmp>/datasets/urban` so a sibling `groundtruth` dir can exist.
    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    pub fn build(self) -> Dataset {
        let tmp = tempfile::tempdir().unwrap();
        let root = if self.nested { tmp.path().join("datasets").join("urban") } else { tmp.path().join("urban") };
        let config = PlaybackConfig { dataset_dir: root.clone(), ..PlaybackConfig::default() };
        let layout = config.layout();

        for robot in &self.robots {
            let mut w = BagWriter::create(layout.scan_log(&robot.name)).unwrap();
            let topic = w.add_topic(&config.scan_topic(&robot.name), KEYED_SCAN).unwrap();
            for (i, &ts) in robot.scans.iter().enumerate() {
                let mut scan = pointcloud::xyz_cloud(&[[i as f32, 0.0, 0.0], [i as f32, 1.0, 0.0]]);
                scan.key = Some(i as u64);
                w.write(topic, ts, &pointcloud::encode_keyed_scan(&scan)).unwrap();
            }

            let mut w = BagWriter::create(layout.pose_log(&robot.name)).unwrap();
            let topic = w.add_topic(&config.pose_topic(&robot.name), ODOMETRY).unwrap();
            for &(stamp, x) in &robot.poses {
                let pose = PoseMessage {
                    header: Header { stamp: Time::from_nanos(stamp), frame_id: "world".into() },
                    position: Point3 { x, y: 0.0, z: 0.0 },
                    ..PoseMessage::default()
                };
                // record time lags the header stamp, as on a real recorder
                w.write(topic, stamp + 1_000, &odometry::encode_odometry(&pose)).unwrap();
            }
        }

        Dataset { tmp, root, robots: self.robots.into_iter().map(|r| r.name).collect() }
    }
}

pub struct Dataset {
    tmp: TempDir,
    pub root: PathBuf,
    pub robots: Vec<String>,
}

impl Dataset {
    pub fn tmp(&self) -> &Path {
        self.tmp.path()
    }

    pub fn config(&self) -> PlaybackConfig {
        PlaybackConfig {
            dataset_dir: self.root.clone(),
            robot_names: self.robots.clone(),
            ..PlaybackConfig::default()
        }
    }

    /// `--dataset-dir` plus one `--robot` per robot.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["--dataset-dir".to_string(), self.root.display().to_string()];
        for robot in &self.robots {
            args.push("--robot".into());
            args.push(robot.clone());
        }
        args
    }
}

/// Robot A and robot B interleaving: A@100, B@150, B@250, A@300.
pub fn two_robot_dataset() -> Dataset {
    DatasetBuilder::new()
        .robot("A", &[100, 300], &[(90, 0.0), (140, 1.0), (260, 2.0)])
        .robot("B", &[150, 250], &[(160, 10.0), (240, 11.0)])
        .build()
}
