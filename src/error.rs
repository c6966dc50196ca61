//! Error taxonomy for ingestion and playback

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = BagSyncError> = std::result::Result<T, E>;

/// Coarse classification of a [`BagSyncError`], stable across context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Corrupt,
    MissingLog,
    UnknownTopic,
    UnknownType,
    DecodeError,
    NoCandidates,
    ConfigInvalid,
    DuplicateDecoder,
    Query,
    Halted,
}

#[derive(Debug, Error)]
pub enum BagSyncError {
    #[error("log container not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read schema of {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("log for robot {robot} does not exist: {}", path.display())]
    MissingLog { robot: String, path: PathBuf },

    #[error("topic {topic} not found in {}", path.display())]
    UnknownTopic { topic: String, path: PathBuf },

    #[error("no decoder registered for type {type_id}")]
    UnknownType { type_id: String },

    #[error("failed to decode {type_id}: {reason}")]
    DecodeError { type_id: String, reason: String },

    #[error("no candidate timestamps to match against")]
    NoCandidates,

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("a decoder is already registered for {0}")]
    DuplicateDecoder(String),

    #[error("query on {} failed: {source}", path.display())]
    Query {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{}: topic {topic}, record {index}: {source}", path.display())]
    Record {
        path: PathBuf,
        topic: String,
        index: usize,
        #[source]
        source: Box<BagSyncError>,
    },

    #[error("robot {robot}: {source}")]
    Robot {
        robot: String,
        #[source]
        source: Box<BagSyncError>,
    },

    #[error("scheduler halted after a failed tick")]
    Halted,
}

impl BagSyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Corrupt { .. } => ErrorKind::Corrupt,
            Self::MissingLog { .. } => ErrorKind::MissingLog,
            Self::UnknownTopic { .. } => ErrorKind::UnknownTopic,
            Self::UnknownType { .. } => ErrorKind::UnknownType,
            Self::DecodeError { .. } => ErrorKind::DecodeError,
            Self::NoCandidates => ErrorKind::NoCandidates,
            Self::ConfigInvalid(_) => ErrorKind::ConfigInvalid,
            Self::DuplicateDecoder(_) => ErrorKind::DuplicateDecoder,
            Self::Query { .. } => ErrorKind::Query,
            Self::Record { source, .. } | Self::Robot { source, .. } => source.kind(),
            Self::Halted => ErrorKind::Halted,
        }
    }

    pub(crate) fn in_record(self, path: impl Into<PathBuf>, topic: &str, index: usize) -> Self {
        Self::Record {
            path: path.into(),
            topic: topic.to_string(),
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn for_robot(self, robot: &str) -> Self {
        Self::Robot {
            robot: robot.to_string(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_survives_wrapping() {
        let err = BagSyncError::DecodeError {
            type_id: "nav_msgs/msg/Odometry".into(),
            reason: "truncated".into(),
        }
        .in_record("/data/a.db3", "/a/odom", 3)
        .for_robot("a");

        assert_eq!(err.kind(), ErrorKind::DecodeError);
        let msg = err.to_string();
        assert!(msg.contains("robot a"));
        assert!(msg.contains("/data/a.db3"));
        assert!(msg.contains("/a/odom"));
        assert!(msg.contains("record 3"));
    }
}
