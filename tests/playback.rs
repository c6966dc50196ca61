mod common;

use std::time::Duration;

use bagsync::{
    ChannelPublisher, DecoderRegistry, ErrorKind, PlaybackEvent, PlaybackOutcome, PlaybackScheduler, Player,
    ReadyFlag, TickOutcome, load_dataset,
};
use common::{DatasetBuilder, two_robot_dataset};

#[test]
fn test_dataset_replays_in_global_order() {
    let dataset = two_robot_dataset();
    let timelines = load_dataset(&dataset.config(), DecoderRegistry::builtin()).unwrap();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let mut scheduler = PlaybackScheduler::new(timelines, publisher);

    let mut order = Vec::new();
    while let TickOutcome::Emitted(e) = scheduler.tick().unwrap() {
        order.push((e.robot, e.scan_ts, e.pose_ts));
    }
    assert_eq!(
        order,
        [
            ("A".to_string(), 100, 90),
            ("B".to_string(), 150, 160),
            ("B".to_string(), 250, 240),
            ("A".to_string(), 300, 260),
        ]
    );

    let events: Vec<_> = rx.drain().collect();
    assert_eq!(events.len(), 12);
    match &events[1] {
        PlaybackEvent::Scan { robot, scan } => {
            assert_eq!(robot, "A");
            assert_eq!(scan.key, Some(0));
            assert_eq!(scan.header.frame_id, "A/sensor");
            assert_eq!(scan.header.stamp.nanosec, 100);
        }
        other => panic!("expected scan, got {other:?}"),
    }
    match &events[11] {
        PlaybackEvent::Pose { robot, pose } => {
            assert_eq!(robot, "A");
            assert_eq!(pose.child_frame_id, "A/base");
            assert_eq!(pose.position.x, 2.0);
        }
        other => panic!("expected pose, got {other:?}"),
    }
}

#[test]
fn test_player_waits_for_readiness() {
    let dataset = two_robot_dataset();
    let timelines = load_dataset(&dataset.config(), DecoderRegistry::builtin()).unwrap();
    let flag = ReadyFlag::new(false);
    let remote = flag.clone();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let mut player = Player::new(PlaybackScheduler::with_gate(timelines, publisher, flag), 500.0).unwrap();

    let opener = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        assert!(rx.is_empty());
        remote.set(true);
        rx
    });
    let summary = player.run().unwrap();
    let rx = opener.join().unwrap();

    assert_eq!(summary.outcome, PlaybackOutcome::Completed);
    assert_eq!(summary.emitted, 4);
    assert_eq!(summary.last_clock_ns, Some(300));
    assert_eq!(rx.len(), 12);
}

#[test]
fn test_robot_without_poses_fails_when_scheduled() {
    let dataset = DatasetBuilder::new().robot("A", &[1, 2], &[(1, 0.0)]).robot("B", &[5], &[]).build();
    let timelines = load_dataset(&dataset.config(), DecoderRegistry::builtin()).unwrap();
    let (publisher, _rx) = ChannelPublisher::unbounded();
    let mut scheduler = PlaybackScheduler::new(timelines, publisher);

    assert!(matches!(scheduler.tick().unwrap(), TickOutcome::Emitted(_)));
    assert!(matches!(scheduler.tick().unwrap(), TickOutcome::Emitted(_)));
    assert_eq!(scheduler.tick().unwrap_err().kind(), ErrorKind::NoCandidates);
    assert_eq!(scheduler.tick().unwrap_err().kind(), ErrorKind::Halted);
}

#[test]
fn test_missing_robot_log() {
    let dataset = two_robot_dataset();
    let mut config = dataset.config();
    config.robot_names.push("C".into());
    let err = load_dataset(&config, DecoderRegistry::builtin()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingLog);
}
