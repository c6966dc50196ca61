//! Decoded message variants and their CDR codecs.

pub mod cdr;
pub mod odometry;
pub mod pointcloud;

pub use pointcloud::PointField;

/// `builtin_interfaces/Time`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    /// Split a nanosecond timestamp into whole seconds and the sub-second remainder.
    ///
    /// `sec` is an int32, so stamps outside roughly 1901..2038 do not fit. Those are
    /// saturated to the nearest representable second and logged.
    pub fn from_nanos(ns: i64) -> Self {
        let secs = ns.div_euclid(1_000_000_000);
        let sec = i32::try_from(secs).unwrap_or_else(|_| {
            tracing::warn!("Timestamp {ns} ns exceeds the int32 seconds range; saturating");
            if secs < 0 { i32::MIN } else { i32::MAX }
        });
        Self {
            sec,
            nanosec: ns.rem_euclid(1_000_000_000) as u32,
        }
    }

    pub fn as_nanos(&self) -> i64 {
        self.sec as i64 * 1_000_000_000 + self.nanosec as i64
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 * 1e-9
    }
}

/// `std_msgs/Header`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

/// A point-cloud scan (`sensor_msgs/PointCloud2`), optionally keyed by a pose-graph node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanMessage {
    pub key: Option<u64>,
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
    pub is_dense: bool,
}

impl ScanMessage {
    pub fn frame_id(&self) -> Option<&str> {
        Some(self.header.frame_id.as_str()).filter(|f| !f.is_empty())
    }

    pub fn point_count(&self) -> u64 {
        self.height as u64 * self.width as u64
    }
}

/// A pose estimate (`nav_msgs/Odometry` or `geometry_msgs/PoseStamped`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseMessage {
    pub header: Header,
    pub child_frame_id: String,
    pub position: Point3,
    pub orientation: Orientation,
}

impl PoseMessage {
    /// Event time taken from the message's own header, not the container record time.
    pub fn stamp_ns(&self) -> i64 {
        self.header.stamp.as_nanos()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Scan(ScanMessage),
    Pose(PoseMessage),
}

impl DecodedMessage {
    pub fn variant_name(&self) -> &'static str {
        match self {
            DecodedMessage::Scan(_) => "scan",
            DecodedMessage::Pose(_) => "pose",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedMessage<T> {
    pub timestamp_ns: i64,
    pub message: T,
}

impl<T> TimestampedMessage<T> {
    pub fn new(timestamp_ns: i64, message: T) -> Self {
        Self { timestamp_ns, message }
    }
}

fn read_header(r: &mut cdr::CdrReader<'_>) -> Result<Header, cdr::CdrError> {
    let sec = r.read_i32()?;
    let nanosec = r.read_u32()?;
    let frame_id = r.read_string()?;
    Ok(Header { stamp: Time { sec, nanosec }, frame_id })
}

fn write_header(w: &mut cdr::CdrWriter, header: &Header) {
    w.write_i32(header.stamp.sec);
    w.write_u32(header.stamp.nanosec);
    w.write_string(&header.frame_id);
}
