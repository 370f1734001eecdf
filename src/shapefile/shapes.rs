//! Shape record decoding across the ESRI shape type taxonomy.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use log::warn;

use super::error::{Result, ShapefileError};
use super::models::{BoundingBox, MultiPoint, Point, PolyLine, Polygon, Shape, ShapeType};

/// Decodes one shape record from the bytes addressed by an index entry.
///
/// # Record Structure
/// ```text
/// [4 bytes] Record number (big-endian i32, one-based)
/// [4 bytes] Content length in 16-bit words (big-endian i32)
/// [4 bytes] Shape type code (little-endian i32)
/// [N bytes] Type-specific payload, all fields little-endian
/// ```
///
/// Only the record header is big-endian; every payload field uses little
/// endian, the opposite of the index file convention.
///
/// Leniency: an unknown type code, or a payload too short for its declared
/// type, decodes to [`Shape::Null`] with a warning so that one bad record
/// never aborts enumeration of the rest of the file. A slice too short to
/// hold the record header itself indicates a corrupt index and is reported
/// as [`ShapefileError::MalformedRecord`].
pub fn decode_record(ordinal: usize, bytes: &[u8]) -> Result<(i32, Shape)> {
    if bytes.len() < 12 {
        return Err(ShapefileError::MalformedRecord {
            ordinal,
            reason: format!("{} bytes is too short for a record header", bytes.len()),
        });
    }

    let mut reader = bytes;
    let record_number = reader.read_i32::<BigEndian>()?;
    let content_length_words = reader.read_i32::<BigEndian>()?;
    let type_code = reader.read_i32::<LittleEndian>()?;

    // The payload ends at the declared content length (which counts the
    // 4-byte type code) or at the end of the slice, whichever comes first.
    let declared_payload = (content_length_words.max(0) as usize * 2).saturating_sub(4);
    let payload = &reader[..reader.len().min(declared_payload)];

    let shape = match ShapeType::try_from(type_code) {
        Ok(shape_type) => match decode_payload(shape_type, payload) {
            Ok(shape) => shape,
            Err(e) => {
                warn!("record {} ({:?}) undecodable, yielding Null: {}", ordinal, shape_type, e);
                Shape::Null
            }
        },
        Err(_) => {
            warn!("record {} has unknown shape type code {}, yielding Null", ordinal, type_code);
            Shape::Null
        }
    };

    Ok((record_number, shape))
}

fn decode_payload(shape_type: ShapeType, payload: &[u8]) -> Result<Shape> {
    let mut reader = payload;
    match shape_type {
        ShapeType::NullShape => Ok(Shape::Null),
        ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => {
            decode_point(shape_type, &mut reader).map(Shape::Point)
        }
        ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
            decode_multi_point(shape_type, &mut reader).map(Shape::MultiPoint)
        }
        ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
            let (bounding_box, parts, z_range, m_range) = decode_poly(shape_type, &mut reader)?;
            Ok(Shape::PolyLine(PolyLine {
                bounding_box,
                parts,
                z_range,
                m_range,
            }))
        }
        ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => {
            let (bounding_box, parts, z_range, m_range) = decode_poly(shape_type, &mut reader)?;
            Ok(Shape::Polygon(Polygon {
                bounding_box,
                parts,
                z_range,
                m_range,
            }))
        }
    }
}

fn decode_point(shape_type: ShapeType, reader: &mut &[u8]) -> Result<Point> {
    let x = reader.read_f64::<LittleEndian>()?;
    let y = reader.read_f64::<LittleEndian>()?;
    let z = if shape_type.has_z() {
        Some(reader.read_f64::<LittleEndian>()?)
    } else {
        None
    };
    // The M value is optional at the end of the record for Z types.
    let m = if shape_type.has_m() && reader.len() >= 8 {
        Some(reader.read_f64::<LittleEndian>()?)
    } else {
        None
    };
    Ok(Point { x, y, z, m })
}

/// ```text
/// [32 bytes] Bounding box (4 little-endian f64)
/// [ 4 bytes] Point count (little-endian i32)
/// [16N bytes] Points as (x, y) pairs
/// Z types then: [16 bytes] Z range, [8N bytes] Z values
/// Z/M types then, if present: [16 bytes] M range, [8N bytes] M values
/// ```
fn decode_multi_point(shape_type: ShapeType, reader: &mut &[u8]) -> Result<MultiPoint> {
    let bounding_box = read_bounding_box(reader)?;
    let num_points = read_count(reader, "point")?;
    ensure_remaining(reader, num_points * 16, "points")?;

    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let x = reader.read_f64::<LittleEndian>()?;
        let y = reader.read_f64::<LittleEndian>()?;
        points.push(Point::new(x, y));
    }

    let (z_range, m_range) = read_measure_channels(shape_type, reader, &mut points)?;

    Ok(MultiPoint {
        bounding_box,
        points,
        z_range,
        m_range,
    })
}

/// Shared layout of PolyLine and Polygon records.
///
/// ```text
/// [32 bytes] Bounding box (4 little-endian f64)
/// [ 4 bytes] Part count (little-endian i32)
/// [ 4 bytes] Point count (little-endian i32)
/// [ 4K bytes] Part start indices into the flat point array (first is 0)
/// [16N bytes] Points as (x, y) pairs
/// Z types then: [16 bytes] Z range, [8N bytes] Z values
/// Z/M types then, if present: [16 bytes] M range, [8N bytes] M values
/// ```
///
/// Parts are materialized by slicing the flat point array between
/// consecutive start indices; the last part runs to the point count.
#[allow(clippy::type_complexity)]
fn decode_poly(
    shape_type: ShapeType,
    reader: &mut &[u8],
) -> Result<(BoundingBox, Vec<Vec<Point>>, Option<(f64, f64)>, Option<(f64, f64)>)> {
    let bounding_box = read_bounding_box(reader)?;
    let num_parts = read_count(reader, "part")?;
    let num_points = read_count(reader, "point")?;
    ensure_remaining(reader, num_parts * 4 + num_points * 16, "parts and points")?;

    let mut part_starts = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        part_starts.push(reader.read_i32::<LittleEndian>()?);
    }

    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let x = reader.read_f64::<LittleEndian>()?;
        let y = reader.read_f64::<LittleEndian>()?;
        points.push(Point::new(x, y));
    }

    let (z_range, m_range) = read_measure_channels(shape_type, reader, &mut points)?;

    let parts = slice_parts(&part_starts, &points)?;
    Ok((bounding_box, parts, z_range, m_range))
}

/// Cuts the flat vertex array into parts along the start indices.
fn slice_parts(part_starts: &[i32], points: &[Point]) -> Result<Vec<Vec<Point>>> {
    if part_starts.is_empty() {
        // Degenerate records without a part table: treat all points as one part.
        if points.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![points.to_vec()]);
    }

    let mut parts = Vec::with_capacity(part_starts.len());
    for (i, &start) in part_starts.iter().enumerate() {
        let start = usize::try_from(start).map_err(|_| {
            ShapefileError::InvalidFormat(format!("negative part start index {}", start))
        })?;
        let end = match part_starts.get(i + 1) {
            Some(&next) => usize::try_from(next).map_err(|_| {
                ShapefileError::InvalidFormat(format!("negative part start index {}", next))
            })?,
            None => points.len(),
        };
        if start > end || end > points.len() {
            return Err(ShapefileError::InvalidFormat(format!(
                "part {} spans {}..{} outside {} points",
                i,
                start,
                end,
                points.len()
            )));
        }
        parts.push(points[start..end].to_vec());
    }
    Ok(parts)
}

/// Reads the Z and optional M blocks that Z/M record types append after the
/// XY data, attaching one value per vertex.
fn read_measure_channels(
    shape_type: ShapeType,
    reader: &mut &[u8],
    points: &mut [Point],
) -> Result<(Option<(f64, f64)>, Option<(f64, f64)>)> {
    let mut z_range = None;
    let mut m_range = None;

    if shape_type.has_z() {
        ensure_remaining(reader, 16 + points.len() * 8, "Z block")?;
        let min = reader.read_f64::<LittleEndian>()?;
        let max = reader.read_f64::<LittleEndian>()?;
        z_range = Some((min, max));
        for point in points.iter_mut() {
            point.z = Some(reader.read_f64::<LittleEndian>()?);
        }
    }

    // The M block is mandatory for M types but optional at the end of a Z
    // record; absence is not an error.
    if shape_type.has_m() && reader.len() >= 16 + points.len() * 8 {
        let min = reader.read_f64::<LittleEndian>()?;
        let max = reader.read_f64::<LittleEndian>()?;
        m_range = Some((min, max));
        for point in points.iter_mut() {
            point.m = Some(reader.read_f64::<LittleEndian>()?);
        }
    }

    Ok((z_range, m_range))
}

fn read_bounding_box(reader: &mut &[u8]) -> Result<BoundingBox> {
    Ok(BoundingBox {
        x_min: reader.read_f64::<LittleEndian>()?,
        y_min: reader.read_f64::<LittleEndian>()?,
        x_max: reader.read_f64::<LittleEndian>()?,
        y_max: reader.read_f64::<LittleEndian>()?,
    })
}

fn read_count(reader: &mut &[u8], what: &str) -> Result<usize> {
    let count = reader.read_i32::<LittleEndian>()?;
    usize::try_from(count)
        .map_err(|_| ShapefileError::InvalidFormat(format!("negative {} count {}", what, count)))
}

fn ensure_remaining(reader: &[u8], needed: usize, what: &str) -> Result<()> {
    if reader.len() < needed {
        return Err(ShapefileError::InvalidFormat(format!(
            "payload truncated in {}: {} bytes needed, {} remain",
            what,
            needed,
            reader.len()
        )));
    }
    Ok(())
}
