//! Odometry / PoseStamped codecs

use super::cdr::{CdrError, CdrReader, CdrWriter};
use super::{Orientation, Point3, PoseMessage, read_header, write_header};

const COVARIANCE_LEN: usize = 36;

/// `nav_msgs/msg/Odometry`. Covariances and twist are parsed past but not kept.
pub fn decode_odometry(payload: &[u8]) -> Result<PoseMessage, CdrError> {
    let mut r = CdrReader::new(payload)?;
    let header = read_header(&mut r)?;
    let child_frame_id = r.read_string()?;
    let (position, orientation) = read_pose(&mut r)?;
    r.skip_f64s(COVARIANCE_LEN)?;
    // twist: linear + angular, then its covariance
    r.skip_f64s(6 + COVARIANCE_LEN)?;
    Ok(PoseMessage { header, child_frame_id, position, orientation })
}

/// `geometry_msgs/msg/PoseStamped`
pub fn decode_pose_stamped(payload: &[u8]) -> Result<PoseMessage, CdrError> {
    let mut r = CdrReader::new(payload)?;
    let header = read_header(&mut r)?;
    let (position, orientation) = read_pose(&mut r)?;
    Ok(PoseMessage { header, child_frame_id: String::new(), position, orientation })
}

fn read_pose(r: &mut CdrReader<'_>) -> Result<(Point3, Orientation), CdrError> {
    let position = Point3 { x: r.read_f64()?, y: r.read_f64()?, z: r.read_f64()? };
    let orientation = Orientation {
        x: r.read_f64()?,
        y: r.read_f64()?,
        z: r.read_f64()?,
        w: r.read_f64()?,
    };
    Ok((position, orientation))
}

pub fn encode_odometry(pose: &PoseMessage) -> Vec<u8> {
    let mut w = CdrWriter::new();
    write_header(&mut w, &pose.header);
    w.write_string(&pose.child_frame_id);
    write_pose(&mut w, pose);
    for _ in 0..(COVARIANCE_LEN + 6 + COVARIANCE_LEN) {
        w.write_f64(0.0);
    }
    w.finish()
}

pub fn encode_pose_stamped(pose: &PoseMessage) -> Vec<u8> {
    let mut w = CdrWriter::new();
    write_header(&mut w, &pose.header);
    write_pose(&mut w, pose);
    w.finish()
}

fn write_pose(w: &mut CdrWriter, pose: &PoseMessage) {
    let p = pose.position;
    let q = pose.orientation;
    for v in [p.x, p.y, p.z, q.x, q.y, q.z, q.w] {
        w.write_f64(v);
    }
}
