//! Type-id → decoder mapping

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{BagSyncError, Result};
use crate::messages::cdr::CdrError;
use crate::messages::{DecodedMessage, odometry, pointcloud};

pub const KEYED_SCAN: &str = "pose_graph_msgs/msg/KeyedScan";
pub const POINT_CLOUD2: &str = "sensor_msgs/msg/PointCloud2";
pub const ODOMETRY: &str = "nav_msgs/msg/Odometry";
pub const POSE_STAMPED: &str = "geometry_msgs/msg/PoseStamped";

pub type DecodeFn = fn(&[u8]) -> Result<DecodedMessage, CdrError>;

static BUILTIN: Lazy<DecoderRegistry> = Lazy::new(|| {
    let mut registry = DecoderRegistry::new();
    let entries: [(&str, DecodeFn); 4] = [
        (KEYED_SCAN, |p| pointcloud::decode_keyed_scan(p).map(DecodedMessage::Scan)),
        (POINT_CLOUD2, |p| pointcloud::decode_pointcloud2(p).map(DecodedMessage::Scan)),
        (ODOMETRY, |p| odometry::decode_odometry(p).map(DecodedMessage::Pose)),
        (POSE_STAMPED, |p| odometry::decode_pose_stamped(p).map(DecodedMessage::Pose)),
    ];
    for (type_id, decode) in entries {
        if let Err(e) = registry.register(type_id, decode) {
            tracing::error!("builtin decoder table: {e}");
        }
    }
    registry
});

/// Read-only after startup: build it, register decoders, then share it by reference.
#[derive(Debug, Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The decoders for every message type this crate understands.
    pub fn builtin() -> &'static DecoderRegistry {
        &BUILTIN
    }

    pub fn register(&mut self, type_id: &str, decode: DecodeFn) -> Result<()> {
        if self.decoders.contains_key(type_id) {
            return Err(BagSyncError::DuplicateDecoder(type_id.to_string()));
        }
        self.decoders.insert(type_id.to_string(), decode);
        Ok(())
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.decoders.contains_key(type_id)
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    pub fn decode(&self, type_id: &str, payload: &[u8]) -> Result<DecodedMessage> {
        let decode = self
            .decoders
            .get(type_id)
            .ok_or_else(|| BagSyncError::UnknownType { type_id: type_id.to_string() })?;
        decode(payload).map_err(|e| BagSyncError::DecodeError {
            type_id: type_id.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::messages::PoseMessage;

    #[test]
    fn test_builtin_covers_scan_and_pose_types() {
        let registry = DecoderRegistry::builtin();
        for type_id in [KEYED_SCAN, POINT_CLOUD2, ODOMETRY, POSE_STAMPED] {
            assert!(registry.contains(type_id), "{type_id} missing");
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = DecoderRegistry::new();
        let decode: DecodeFn = |p| odometry::decode_odometry(p).map(DecodedMessage::Pose);
        registry.register(ODOMETRY, decode).unwrap();
        let err = registry.register(ODOMETRY, decode).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDecoder);
    }

    #[test]
    fn test_unknown_type() {
        let err = DecoderRegistry::builtin().decode("std_msgs/msg/String", &[0, 1, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownType);
    }

    #[test]
    fn test_decode_dispatches_by_type() {
        let bytes = odometry::encode_odometry(&PoseMessage::default());
        let msg = DecoderRegistry::builtin().decode(ODOMETRY, &bytes).unwrap();
        assert!(matches!(msg, DecodedMessage::Pose(_)));

        let err = DecoderRegistry::builtin().decode(KEYED_SCAN, &bytes[..8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }
}
