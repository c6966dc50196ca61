//! Merge of per-robot timelines into one paced, globally ordered stream

use crate::error::{BagSyncError, Result};
use crate::messages::Time;
use crate::nearest::nearest;
use crate::publisher::Publisher;
use crate::readiness::{AlwaysReady, ReadinessGate};
use crate::timeline::RobotTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Ticking,
    AwaitingReady,
    Emitting,
    Done,
    Error,
}

/// One emitted scan/pose pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub robot: String,
    pub robot_index: usize,
    pub scan_index: usize,
    pub pose_index: usize,
    pub scan_ts: i64,
    pub pose_ts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The gate refused; nothing was emitted or advanced.
    Waiting,
    Emitted(Emission),
    Done,
}

/// Everything the scheduler mutates between ticks.
#[derive(Debug)]
pub struct PlaybackState {
    timelines: Vec<RobotTimeline>,
    watermark: Option<i64>,
    state: SchedulerState,
    stall_reported: bool,
}

impl PlaybackState {
    fn new(timelines: Vec<RobotTimeline>) -> Self {
        Self { timelines, watermark: None, state: SchedulerState::Idle, stall_reported: false }
    }

    /// Robot holding the smallest pending scan; the earliest robot wins ties.
    fn next_robot(&self) -> Option<(usize, i64)> {
        let mut best: Option<(usize, i64)> = None;
        for (i, timeline) in self.timelines.iter().enumerate() {
            if let Some(ts) = timeline.next_scan_ts()
                && best.is_none_or(|(_, best_ts)| ts < best_ts)
            {
                best = Some((i, ts));
            }
        }
        best
    }

    fn all_exhausted(&self) -> bool {
        self.timelines.iter().all(RobotTimeline::is_exhausted)
    }
}

pub struct PlaybackScheduler<P, G = AlwaysReady> {
    playback: PlaybackState,
    publisher: P,
    gate: G,
}

impl<P: Publisher> PlaybackScheduler<P, AlwaysReady> {
    pub fn new(timelines: Vec<RobotTimeline>, publisher: P) -> Self {
        Self::with_gate(timelines, publisher, AlwaysReady)
    }
}

impl<P: Publisher, G: ReadinessGate> PlaybackScheduler<P, G> {
    pub fn with_gate(timelines: Vec<RobotTimeline>, publisher: P, gate: G) -> Self {
        Self { playback: PlaybackState::new(timelines), publisher, gate }
    }

    pub fn state(&self) -> SchedulerState {
        self.playback.state
    }

    pub fn timelines(&self) -> &[RobotTimeline] {
        &self.playback.timelines
    }

    /// Timestamp of the last emitted scan.
    pub fn watermark(&self) -> Option<i64> {
        self.playback.watermark
    }

    pub fn total_scans(&self) -> usize {
        self.playback.timelines.iter().map(|t| t.scans().len()).sum()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Advance playback by at most one scan/pose pair.
    ///
    /// Once `Done`, further ticks emit nothing and report `Done` again. After a
    /// failed tick every call fails with [`BagSyncError::Halted`].
    pub fn tick(&mut self) -> Result<TickOutcome> {
        match self.playback.state {
            SchedulerState::Done => return Ok(TickOutcome::Done),
            SchedulerState::Error => return Err(BagSyncError::Halted),
            _ => {}
        }
        self.playback.state = SchedulerState::Ticking;

        if !self.gate.is_ready() {
            self.playback.state = SchedulerState::AwaitingReady;
            if !self.playback.stall_reported {
                tracing::info!("downstream not ready, holding playback");
                self.playback.stall_reported = true;
            }
            self.playback.state = SchedulerState::Ticking;
            return Ok(TickOutcome::Waiting);
        }

        let Some((robot_index, scan_ts)) = self.playback.next_robot() else {
            self.finish();
            return Ok(TickOutcome::Done);
        };

        self.playback.state = SchedulerState::Emitting;
        match self.emit(robot_index, scan_ts) {
            Ok(emission) => {
                self.playback.stall_reported = false;
                self.playback.state = SchedulerState::Ticking;
                if self.playback.all_exhausted() {
                    self.finish();
                }
                Ok(TickOutcome::Emitted(emission))
            }
            Err(e) => {
                self.playback.state = SchedulerState::Error;
                let robot = self.playback.timelines[robot_index].robot_name();
                Err(e.for_robot(robot))
            }
        }
    }

    fn emit(&mut self, robot_index: usize, scan_ts: i64) -> Result<Emission> {
        let timeline = &mut self.playback.timelines[robot_index];
        let pose_index = nearest(scan_ts, timeline.pose_stamps())?;
        let pose_ts = timeline.pose_stamps()[pose_index];
        let scan_index = timeline.cursor();
        let last_index = timeline.scans().len().saturating_sub(1);
        let robot = timeline.robot_name().to_string();
        let frames = timeline.frames().clone();

        if let Some(watermark) = self.playback.watermark
            && scan_ts < watermark
        {
            tracing::warn!(
                "{robot} scan #{scan_index} at {scan_ts} ns precedes the last emitted scan at {watermark} ns; input is not sorted"
            );
        }

        let (scan, pose) = timeline.current_pair_mut(pose_index).ok_or(BagSyncError::NoCandidates)?;
        if scan.frame_id().is_none() {
            scan.header.frame_id = frames.scan_frame;
        }
        scan.header.stamp = Time::from_nanos(scan_ts);
        pose.child_frame_id = frames.pose_child_frame;

        tracing::info!(
            "{robot} scan #{scan_index}/{last_index} stamp {:.3} odom stamp {:.3}: delta t {:.3}s",
            scan_ts as f64 * 1e-9,
            pose_ts as f64 * 1e-9,
            (scan_ts - pose_ts) as f64 * 1e-9,
        );

        self.publisher.publish_clock(scan_ts);
        self.publisher.publish_scan(&robot, scan);
        self.publisher.publish_pose(&robot, pose);

        timeline.advance();
        self.playback.watermark = Some(scan_ts);

        Ok(Emission { robot, robot_index, scan_index, pose_index, scan_ts, pose_ts })
    }

    fn finish(&mut self) {
        if self.playback.state != SchedulerState::Done {
            tracing::info!("All robots finished playback");
        }
        self.playback.state = SchedulerState::Done;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;
    use crate::error::ErrorKind;
    use crate::messages::{Header, PoseMessage, ScanMessage, TimestampedMessage};
    use crate::publisher::{ChannelPublisher, PlaybackEvent};

    fn timeline(name: &str, scans: &[i64], poses: &[i64]) -> RobotTimeline {
        let scans = scans
            .iter()
            .map(|&ts| TimestampedMessage::new(ts, ScanMessage::default()))
            .collect();
        let poses = poses
            .iter()
            .map(|&ts| {
                let pose = PoseMessage {
                    header: Header { stamp: Time::from_nanos(ts), frame_id: "world".into() },
                    child_frame_id: "odom_child".into(),
                    ..PoseMessage::default()
                };
                TimestampedMessage::new(ts, pose)
            })
            .collect();
        RobotTimeline::new(name, scans, poses)
    }

    fn run_to_end<P: Publisher, G: ReadinessGate>(s: &mut PlaybackScheduler<P, G>) -> Vec<Emission> {
        let mut out = Vec::new();
        for _ in 0..10_000 {
            match s.tick().unwrap() {
                TickOutcome::Emitted(e) => out.push(e),
                TickOutcome::Done => return out,
                TickOutcome::Waiting => {}
            }
        }
        panic!("playback did not finish");
    }

    #[test]
    fn test_two_robot_scenario() {
        let (publisher, rx) = ChannelPublisher::unbounded();
        let mut s = PlaybackScheduler::new(
            vec![timeline("A", &[100, 300], &[90, 140, 260]), timeline("B", &[150, 250], &[160, 240])],
            publisher,
        );

        let emitted = run_to_end(&mut s);
        let order: Vec<_> = emitted.iter().map(|e| (e.robot.as_str(), e.scan_ts, e.pose_ts)).collect();
        assert_eq!(order, [("A", 100, 90), ("B", 150, 160), ("B", 250, 240), ("A", 300, 260)]);

        let clocks: Vec<_> = rx
            .drain()
            .filter_map(|e| match e {
                PlaybackEvent::Clock { timestamp_ns } => Some(timestamp_ns),
                _ => None,
            })
            .collect();
        assert_eq!(clocks, [100, 150, 250, 300]);
        assert_eq!(s.state(), SchedulerState::Done);
        assert_eq!(s.watermark(), Some(300));
    }

    #[test]
    fn test_emission_order_and_normalization() {
        let (publisher, rx) = ChannelPublisher::unbounded();
        let a = timeline("a", &[1_500_000_123, 1_600_000_000], &[1_500_000_000]);
        let mut s = PlaybackScheduler::new(vec![a], publisher);
        s.tick().unwrap();

        let events: Vec<_> = rx.drain().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], PlaybackEvent::Clock { timestamp_ns: 1_500_000_123 }));
        match &events[1] {
            PlaybackEvent::Scan { robot, scan } => {
                assert_eq!(robot, "a");
                assert_eq!(scan.header.frame_id, "a/sensor");
                assert_eq!(scan.header.stamp, Time { sec: 1, nanosec: 500_000_123 });
            }
            other => panic!("expected scan, got {other:?}"),
        }
        match &events[2] {
            PlaybackEvent::Pose { robot, pose } => {
                assert_eq!(robot, "a");
                assert_eq!(pose.child_frame_id, "a/base");
                assert_eq!(pose.header.frame_id, "world");
            }
            other => panic!("expected pose, got {other:?}"),
        }
    }

    #[test]
    fn test_existing_scan_frame_is_kept() {
        let poses = timeline("a", &[], &[10]).poses().to_vec();
        let scan = ScanMessage { header: Header { frame_id: "velodyne".into(), ..Header::default() }, ..ScanMessage::default() };
        let t = RobotTimeline::new("a", vec![TimestampedMessage::new(10, scan)], poses);
        let (publisher, rx) = ChannelPublisher::unbounded();
        let mut s = PlaybackScheduler::new(vec![t], publisher);
        s.tick().unwrap();

        let scan = rx
            .drain()
            .find_map(|e| match e {
                PlaybackEvent::Scan { scan, .. } => Some(scan),
                _ => None,
            })
            .unwrap();
        assert_eq!(scan.header.frame_id, "velodyne");
    }

    #[test]
    fn test_readiness_backpressure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let gate = move || counter.fetch_add(1, Ordering::SeqCst) >= 3;

        let (publisher, rx) = ChannelPublisher::unbounded();
        let timelines = vec![timeline("A", &[100, 300], &[90, 140, 260]), timeline("B", &[150, 250], &[160, 240])];
        let mut s = PlaybackScheduler::with_gate(timelines, publisher, gate);

        for _ in 0..3 {
            assert_eq!(s.tick().unwrap(), TickOutcome::Waiting);
            assert_eq!(s.state(), SchedulerState::Ticking);
            assert!(s.timelines().iter().all(|t| t.cursor() == 0));
            assert!(rx.is_empty());
        }
        match s.tick().unwrap() {
            TickOutcome::Emitted(e) => assert_eq!((e.robot.as_str(), e.scan_ts, e.pose_ts), ("A", 100, 90)),
            other => panic!("expected an emission, got {other:?}"),
        }
        assert_eq!(s.timelines()[0].cursor(), 1);
        assert_eq!(s.timelines()[1].cursor(), 0);
        assert_eq!(rx.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_ticks_after_done_emit_nothing() {
        let (publisher, rx) = ChannelPublisher::unbounded();
        let mut s = PlaybackScheduler::new(vec![timeline("a", &[1, 2], &[1])], publisher);
        assert!(matches!(s.tick().unwrap(), TickOutcome::Emitted(_)));
        assert!(matches!(s.tick().unwrap(), TickOutcome::Emitted(_)));
        assert_eq!(s.state(), SchedulerState::Done);
        rx.drain().for_each(drop);

        for _ in 0..3 {
            assert_eq!(s.tick().unwrap(), TickOutcome::Done);
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_no_scans_is_done() {
        let (publisher, _rx) = ChannelPublisher::unbounded();
        let mut s = PlaybackScheduler::new(vec![timeline("a", &[], &[1])], publisher);
        assert_eq!(s.tick().unwrap(), TickOutcome::Done);
    }

    #[test]
    fn test_empty_poses_halt_playback() {
        let (publisher, rx) = ChannelPublisher::unbounded();
        let mut s = PlaybackScheduler::new(vec![timeline("a", &[1], &[])], publisher);

        let err = s.tick().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoCandidates);
        assert!(err.to_string().contains("robot a"));
        assert_eq!(s.state(), SchedulerState::Error);
        assert_eq!(s.tick().unwrap_err().kind(), ErrorKind::Halted);
        assert!(rx.is_empty());
        assert_eq!(s.timelines()[0].cursor(), 0);
    }

    #[test]
    fn test_unsorted_input_breaks_clock_monotonicity() {
        let (publisher, _rx) = ChannelPublisher::unbounded();
        let mut s =
            PlaybackScheduler::new(vec![timeline("a", &[300, 100], &[100]), timeline("b", &[200], &[200])], publisher);
        let stamps: Vec<_> = run_to_end(&mut s).iter().map(|e| e.scan_ts).collect();
        assert_eq!(stamps, [200, 300, 100]);
    }

    fn sorted_robots() -> impl Strategy<Value = Vec<(Vec<i64>, Vec<i64>)>> {
        let robot = (
            prop::collection::vec(0i64..500, 0..12),
            prop::collection::vec(0i64..500, 1..8),
        )
            .prop_map(|(mut scans, mut poses)| {
                scans.sort();
                poses.sort();
                (scans, poses)
            });
        prop::collection::vec(robot, 1..5)
    }

    proptest! {
        #[test]
        fn test_merge_is_global_order(robots in sorted_robots()) {
            let timelines: Vec<_> = robots
                .iter()
                .enumerate()
                .map(|(i, (scans, poses))| timeline(&format!("r{i}"), scans, poses))
                .collect();
            let (publisher, _rx) = ChannelPublisher::unbounded();
            let mut s = PlaybackScheduler::new(timelines, publisher);
            let total = s.total_scans();

            let mut emitted = Vec::new();
            let mut cursors = vec![0usize; robots.len()];
            loop {
                match s.tick().unwrap() {
                    TickOutcome::Emitted(e) => {
                        for (i, t) in s.timelines().iter().enumerate() {
                            prop_assert!(t.cursor() >= cursors[i]);
                            cursors[i] = t.cursor();
                        }
                        emitted.push(e);
                    }
                    TickOutcome::Done => break,
                    TickOutcome::Waiting => unreachable!(),
                }
                prop_assert!(emitted.len() <= total);
            }

            prop_assert_eq!(emitted.len(), total);
            for pair in emitted.windows(2) {
                prop_assert!(pair[0].scan_ts <= pair[1].scan_ts);
                if pair[0].scan_ts == pair[1].scan_ts {
                    prop_assert!(pair[0].robot_index <= pair[1].robot_index);
                }
            }

            let mut expected: Vec<i64> = robots.iter().flat_map(|(s, _)| s.iter().copied()).collect();
            expected.sort();
            let got: Vec<i64> = emitted.iter().map(|e| e.scan_ts).collect();
            prop_assert_eq!(got, expected);

            for e in &emitted {
                let poses = &robots[e.robot_index].1;
                prop_assert_eq!(e.pose_index, crate::nearest::nearest_linear(e.scan_ts, poses).unwrap());
            }
            for (t, (scans, _)) in s.timelines().iter().zip(&robots) {
                prop_assert_eq!(t.cursor(), scans.len());
            }
        }
    }
}
