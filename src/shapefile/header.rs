//! Parsing of the 100-byte header shared by the main and index files.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, trace};

use super::error::{Result, ShapefileError};
use super::models::{BoundingBox, FileHeader, ShapeType};

/// Length of the fixed header at the start of both .shp and .shx files.
pub const HEADER_LENGTH: usize = 100;

/// Parses the fixed header from the first 100 bytes of a .shp or .shx stream.
///
/// # Header Structure
/// ```text
/// [ 4 bytes] File code (big-endian i32, present but not interpreted)
/// [20 bytes] Unused
/// [ 4 bytes] File length in 16-bit words, header included (big-endian u32)
/// [ 4 bytes] Version (little-endian i32)
/// [ 4 bytes] Shape type code (little-endian i32)
/// [32 bytes] Bounding box: x min, y min, x max, y max (little-endian f64)
/// [16 bytes] Z range: min, max (little-endian f64)
/// [16 bytes] M range: min, max (little-endian f64)
/// ```
///
/// The mixed byte order is a property of the format: lengths are big-endian,
/// everything from the version on is little-endian.
///
/// `file` names the stream ("main" or "index") for error reporting. A buffer
/// shorter than 100 bytes fails with [`ShapefileError::TruncatedHeader`]; an
/// unrecognized shape type code fails with [`ShapefileError::InvalidShapeType`].
pub fn parse(buf: &[u8], file: &'static str) -> Result<FileHeader> {
    if buf.len() < HEADER_LENGTH {
        return Err(ShapefileError::TruncatedHeader {
            file,
            expected: HEADER_LENGTH as u64,
            found: buf.len() as u64,
        });
    }

    let file_code = BigEndian::read_i32(&buf[0..4]);
    trace!("{} header file code: {}", file, file_code);

    let file_length_words = BigEndian::read_u32(&buf[24..28]);
    let version = LittleEndian::read_i32(&buf[28..32]);
    let type_code = LittleEndian::read_i32(&buf[32..36]);
    let shape_type = ShapeType::try_from(type_code)?;

    let bounding_box = BoundingBox {
        x_min: LittleEndian::read_f64(&buf[36..44]),
        y_min: LittleEndian::read_f64(&buf[44..52]),
        x_max: LittleEndian::read_f64(&buf[52..60]),
        y_max: LittleEndian::read_f64(&buf[60..68]),
    };
    let z_range = (
        LittleEndian::read_f64(&buf[68..76]),
        LittleEndian::read_f64(&buf[76..84]),
    );
    let m_range = (
        LittleEndian::read_f64(&buf[84..92]),
        LittleEndian::read_f64(&buf[92..100]),
    );

    debug!(
        "{} header: type={:?}, length={} words, version={}",
        file, shape_type, file_length_words, version
    );

    Ok(FileHeader {
        file_length_words,
        version,
        shape_type,
        bounding_box,
        z_range,
        m_range,
    })
}
