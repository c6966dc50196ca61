//! Sinks for the synchronized stream

use flume::{Receiver, Sender};

use crate::messages::{PoseMessage, ScanMessage};

pub const CLOCK_TOPIC: &str = "/clock";

pub fn scan_output_topic(robot: &str) -> String {
    format!("/{robot}/points")
}

pub fn pose_output_topic(robot: &str) -> String {
    format!("/{robot}/odom")
}

/// Receives the clock tick, scan and pose of every emission, in that order.
///
/// Fire-and-forget: a sink that fails to deliver logs it and carries on.
pub trait Publisher {
    fn publish_clock(&mut self, timestamp_ns: i64);
    fn publish_scan(&mut self, robot: &str, scan: &ScanMessage);
    fn publish_pose(&mut self, robot: &str, pose: &PoseMessage);
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish_clock(&mut self, timestamp_ns: i64) {
        (**self).publish_clock(timestamp_ns)
    }

    fn publish_scan(&mut self, robot: &str, scan: &ScanMessage) {
        (**self).publish_scan(robot, scan)
    }

    fn publish_pose(&mut self, robot: &str, pose: &PoseMessage) {
        (**self).publish_pose(robot, pose)
    }
}

impl<P: Publisher> Publisher for Option<P> {
    fn publish_clock(&mut self, timestamp_ns: i64) {
        if let Some(p) = self {
            p.publish_clock(timestamp_ns);
        }
    }

    fn publish_scan(&mut self, robot: &str, scan: &ScanMessage) {
        if let Some(p) = self {
            p.publish_scan(robot, scan);
        }
    }

    fn publish_pose(&mut self, robot: &str, pose: &PoseMessage) {
        if let Some(p) = self {
            p.publish_pose(robot, pose);
        }
    }
}

/// Fan out to two sinks, first then second.
impl<A: Publisher, B: Publisher> Publisher for (A, B) {
    fn publish_clock(&mut self, timestamp_ns: i64) {
        self.0.publish_clock(timestamp_ns);
        self.1.publish_clock(timestamp_ns);
    }

    fn publish_scan(&mut self, robot: &str, scan: &ScanMessage) {
        self.0.publish_scan(robot, scan);
        self.1.publish_scan(robot, scan);
    }

    fn publish_pose(&mut self, robot: &str, pose: &PoseMessage) {
        self.0.publish_pose(robot, pose);
        self.1.publish_pose(robot, pose);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Clock { timestamp_ns: i64 },
    Scan { robot: String, scan: ScanMessage },
    Pose { robot: String, pose: PoseMessage },
}

/// Forwards every message over a `flume` channel to a consumer on another thread.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: Sender<PlaybackEvent>,
}

impl ChannelPublisher {
    pub fn unbounded() -> (Self, Receiver<PlaybackEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    pub fn bounded(capacity: usize) -> (Self, Receiver<PlaybackEvent>) {
        let (tx, rx) = flume::bounded(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, event: PlaybackEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("playback event dropped: receiver gone");
        }
    }
}

impl Publisher for ChannelPublisher {
    fn publish_clock(&mut self, timestamp_ns: i64) {
        self.send(PlaybackEvent::Clock { timestamp_ns });
    }

    fn publish_scan(&mut self, robot: &str, scan: &ScanMessage) {
        self.send(PlaybackEvent::Scan { robot: robot.to_string(), scan: scan.clone() });
    }

    fn publish_pose(&mut self, robot: &str, pose: &PoseMessage) {
        self.send(PlaybackEvent::Pose { robot: robot.to_string(), pose: pose.clone() });
    }
}

/// Logs each message at `debug`; the default sink of `play`.
#[derive(Debug, Default)]
pub struct TracingPublisher;

impl Publisher for TracingPublisher {
    fn publish_clock(&mut self, timestamp_ns: i64) {
        tracing::debug!(topic = CLOCK_TOPIC, timestamp_ns, "clock");
    }

    fn publish_scan(&mut self, robot: &str, scan: &ScanMessage) {
        tracing::debug!(
            topic = %scan_output_topic(robot),
            frame_id = %scan.header.frame_id,
            points = scan.point_count(),
            "scan"
        );
    }

    fn publish_pose(&mut self, robot: &str, pose: &PoseMessage) {
        tracing::debug!(
            topic = %pose_output_topic(robot),
            child_frame_id = %pose.child_frame_id,
            x = pose.position.x,
            y = pose.position.y,
            z = pose.position.z,
            "pose"
        );
    }
}
