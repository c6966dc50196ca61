//! bagsync - replay multi-robot ROS 2 rosbag logs as one synchronized stream
//!
//! Each robot's dataset contributes a scan log and a pose log (rosbag2 SQLite
//! `.db3` containers with CDR payloads). The scheduler merges all robots'
//! scans into one globally time-ordered sequence, pairs every scan with its
//! temporally nearest pose and publishes a virtual clock tick, the scan and
//! the pose on each tick of a fixed-rate timer.
//!
//! # Supported message types
//!
//! - **Scans**: `pose_graph_msgs/KeyedScan`, `sensor_msgs/PointCloud2`
//! - **Poses**: `nav_msgs/Odometry`, `geometry_msgs/PoseStamped`
//!
//! # Example
//!
//! ```rust,no_run
//! use bagsync::{DecoderRegistry, PlaybackConfig, PlaybackScheduler, Player, TracingPublisher, load_dataset};
//!
//! let config = PlaybackConfig {
//!     dataset_dir: "/data/nebula/urban".into(),
//!     robot_names: vec!["husky1".into(), "spot1".into()],
//!     rate: 10.0,
//!     ..PlaybackConfig::default()
//! };
//! let timelines = load_dataset(&config, DecoderRegistry::builtin())?;
//! let scheduler = PlaybackScheduler::new(timelines, TracingPublisher);
//! let summary = Player::new(scheduler, config.rate)?.run()?;
//! println!("emitted {} scans", summary.emitted);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bag_store;
pub mod cli;
pub mod config;
pub mod error;
pub mod groundtruth;
pub mod info;
pub mod messages;
pub mod nearest;
pub mod player;
pub mod publisher;
pub mod readiness;
pub mod registry;
pub mod rrd_writer;
pub mod scheduler;
pub mod timeline;

// Re-export main types for convenience
pub use bag_store::{BagWriter, LogRecord, LogStore, TopicDescriptor, TopicSummary};
pub use config::PlaybackConfig;
pub use error::{BagSyncError, ErrorKind};
pub use messages::{DecodedMessage, PoseMessage, ScanMessage, TimestampedMessage};
pub use player::{PlaybackOutcome, PlaybackSummary, Player, StopHandle};
pub use publisher::{ChannelPublisher, PlaybackEvent, Publisher, TracingPublisher};
pub use readiness::{AlwaysReady, ReadinessGate, ReadyFlag};
pub use registry::DecoderRegistry;
pub use rrd_writer::RerunPublisher;
pub use scheduler::{Emission, PlaybackScheduler, SchedulerState, TickOutcome};
pub use timeline::{RobotTimeline, load_dataset};
