//! PointCloud2 and KeyedScan codecs, plus xyz extraction for visualization

use super::cdr::{CdrError, CdrReader, CdrWriter};
use super::{ScanMessage, read_header, write_header};

pub const FLOAT32: u8 = 7;
pub const FLOAT64: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

/// `sensor_msgs/msg/PointCloud2`
pub fn decode_pointcloud2(payload: &[u8]) -> Result<ScanMessage, CdrError> {
    let mut r = CdrReader::new(payload)?;
    read_pointcloud2(&mut r)
}

/// `pose_graph_msgs/msg/KeyedScan`: a node key followed by the cloud.
pub fn decode_keyed_scan(payload: &[u8]) -> Result<ScanMessage, CdrError> {
    let mut r = CdrReader::new(payload)?;
    let key = r.read_u64()?;
    let mut scan = read_pointcloud2(&mut r)?;
    scan.key = Some(key);
    Ok(scan)
}

fn read_pointcloud2(r: &mut CdrReader<'_>) -> Result<ScanMessage, CdrError> {
    let header = read_header(r)?;
    let height = r.read_u32()?;
    let width = r.read_u32()?;
    let fields = read_fields(r)?;
    let is_bigendian = r.read_bool()?;
    let point_step = r.read_u32()?;
    let row_step = r.read_u32()?;
    let data = r.read_byte_seq()?;
    let is_dense = r.read_bool()?;
    Ok(ScanMessage {
        key: None,
        header,
        height,
        width,
        fields,
        is_bigendian,
        point_step,
        row_step,
        data,
        is_dense,
    })
}

fn read_fields(r: &mut CdrReader<'_>) -> Result<Vec<PointField>, CdrError> {
    let len = r.read_u32()? as usize;
    // each field takes at least 13 bytes, so a bogus length fails fast
    let mut fields = Vec::with_capacity(len.min(r.remaining() / 13 + 1));
    for _ in 0..len {
        let name = r.read_string()?;
        let offset = r.read_u32()?;
        let datatype = r.read_u8()?;
        let count = r.read_u32()?;
        fields.push(PointField { name, offset, datatype, count });
    }
    Ok(fields)
}

pub fn encode_pointcloud2(scan: &ScanMessage) -> Vec<u8> {
    let mut w = CdrWriter::new();
    write_pointcloud2(&mut w, scan);
    w.finish()
}

pub fn encode_keyed_scan(scan: &ScanMessage) -> Vec<u8> {
    let mut w = CdrWriter::new();
    w.write_u64(scan.key.unwrap_or_default());
    write_pointcloud2(&mut w, scan);
    w.finish()
}

fn write_pointcloud2(w: &mut CdrWriter, scan: &ScanMessage) {
    write_header(w, &scan.header);
    w.write_u32(scan.height);
    w.write_u32(scan.width);
    w.write_u32(scan.fields.len() as u32);
    for f in &scan.fields {
        w.write_string(&f.name);
        w.write_u32(f.offset);
        w.write_u8(f.datatype);
        w.write_u32(f.count);
    }
    w.write_bool(scan.is_bigendian);
    w.write_u32(scan.point_step);
    w.write_u32(scan.row_step);
    w.write_byte_seq(&scan.data);
    w.write_bool(scan.is_dense);
}

/// Build a dense, unorganized FLOAT32 xyz cloud.
pub fn xyz_cloud(points: &[[f32; 3]]) -> ScanMessage {
    let fields = ["x", "y", "z"]
        .iter()
        .enumerate()
        .map(|(i, name)| PointField {
            name: name.to_string(),
            offset: i as u32 * 4,
            datatype: FLOAT32,
            count: 1,
        })
        .collect();
    let data = points
        .iter()
        .flat_map(|p| p.iter().flat_map(|v| v.to_le_bytes()))
        .collect();
    ScanMessage {
        height: 1,
        width: points.len() as u32,
        fields,
        point_step: 12,
        row_step: 12 * points.len() as u32,
        data,
        is_dense: true,
        ..ScanMessage::default()
    }
}

/// Finite xyz positions of a cloud; non-finite points are dropped.
pub fn xyz_points(scan: &ScanMessage) -> Vec<[f32; 3]> {
    if scan.is_bigendian {
        tracing::warn!("Big-endian PointCloud2 not supported; skipping");
        return vec![];
    }
    let field = |name: &str| {
        scan.fields
            .iter()
            .find(|f| f.name == name && (f.datatype == FLOAT32 || f.datatype == FLOAT64))
    };
    let (Some(x), Some(y), Some(z)) = (field("x"), field("y"), field("z")) else {
        tracing::warn!("PointCloud2 missing x/y/z fields; skipping");
        return vec![];
    };

    let point_step = scan.point_step as usize;
    if point_step == 0 {
        return vec![];
    }
    // height * width is not checked against the payload; trust the bytes
    let present = (scan.data.len() / point_step).min(usize::try_from(scan.point_count()).unwrap_or(usize::MAX));
    let mut positions = Vec::with_capacity(present);
    for point in scan.data.chunks_exact(point_step).take(present) {
        let (Some(px), Some(py), Some(pz)) = (read_coord(point, x), read_coord(point, y), read_coord(point, z)) else {
            continue;
        };
        if px.is_finite() && py.is_finite() && pz.is_finite() {
            positions.push([px, py, pz]);
        }
    }
    positions
}

fn read_coord(point: &[u8], field: &PointField) -> Option<f32> {
    let off = field.offset as usize;
    match field.datatype {
        FLOAT32 => point
            .get(off..off + 4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        FLOAT64 => point
            .get(off..off + 8)
            .and_then(|b| b.try_into().ok())
            .map(|b: [u8; 8]| f64::from_le_bytes(b) as f32),
        _ => None,
    }
}
