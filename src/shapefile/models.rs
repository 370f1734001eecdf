//! Data structures representing Shapefile format components.

use super::dbf::record::AttributeRecord;
use super::error::{Result, ShapefileError};

/// Shape type codes used by the main file header and by each record.
///
/// Z variants carry an elevation per vertex, M variants a measure. A file
/// declares exactly one type but individual records may also be `NullShape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    NullShape = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
}

impl ShapeType {
    /// True if records of this type carry a Z channel.
    pub fn has_z(&self) -> bool {
        matches!(
            self,
            ShapeType::PointZ | ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ
        )
    }

    /// True if records of this type carry an M channel (Z types may too).
    pub fn has_m(&self) -> bool {
        self.has_z()
            || matches!(
                self,
                ShapeType::PointM
                    | ShapeType::PolyLineM
                    | ShapeType::PolygonM
                    | ShapeType::MultiPointM
            )
    }
}

impl TryFrom<i32> for ShapeType {
    type Error = ShapefileError;
    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::NullShape),
            1 => Ok(Self::Point),
            3 => Ok(Self::PolyLine),
            5 => Ok(Self::Polygon),
            8 => Ok(Self::MultiPoint),
            11 => Ok(Self::PointZ),
            13 => Ok(Self::PolyLineZ),
            15 => Ok(Self::PolygonZ),
            18 => Ok(Self::MultiPointZ),
            21 => Ok(Self::PointM),
            23 => Ok(Self::PolyLineM),
            25 => Ok(Self::PolygonM),
            28 => Ok(Self::MultiPointM),
            _ => Err(ShapefileError::InvalidShapeType(code)),
        }
    }
}

/// Axis-aligned extent, as read from a header or record. Never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

/// Parsed 100-byte header shared by the main (.shp) and index (.shx) files.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    /// Total file length in 16-bit words, header included.
    pub file_length_words: u32,
    pub version: i32,
    pub shape_type: ShapeType,
    pub bounding_box: BoundingBox,
    /// Z extent; meaningful only for Z shape types.
    pub z_range: (f64, f64),
    /// M extent; meaningful only for M (or Z) shape types.
    pub m_range: (f64, f64),
}

/// One .shx entry: the location of a single shape record in the main file.
///
/// Both fields are stored big-endian in the file, unlike the little-endian
/// convention used by record payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the record (including its 8-byte header) in 16-bit words.
    pub offset_words: u32,
    /// Length of the record content in 16-bit words, header excluded.
    pub content_length_words: u32,
}

impl IndexEntry {
    /// Byte offset of the record in the main file.
    pub fn byte_offset(&self) -> u64 {
        self.offset_words as u64 * 2
    }

    /// Byte length of the record including its 8-byte record header.
    pub fn byte_length(&self) -> usize {
        self.content_length_words as usize * 2 + 8
    }
}

/// A single vertex. `z` and `m` are present only for Z/M-augmented records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }
}

/// An unordered set of points sharing one bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPoint {
    pub bounding_box: BoundingBox,
    pub points: Vec<Point>,
    pub z_range: Option<(f64, f64)>,
    pub m_range: Option<(f64, f64)>,
}

/// An ordered set of parts, each a connected run of vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyLine {
    pub bounding_box: BoundingBox,
    pub parts: Vec<Vec<Point>>,
    pub z_range: Option<(f64, f64)>,
    pub m_range: Option<(f64, f64)>,
}

/// One or more rings. Ring winding (clockwise outer, counter-clockwise hole)
/// is preserved exactly as read, never corrected.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub bounding_box: BoundingBox,
    pub parts: Vec<Vec<Point>>,
    pub z_range: Option<(f64, f64)>,
    pub m_range: Option<(f64, f64)>,
}

/// A decoded geometry record.
///
/// A closed set of variants; consumers pattern-match instead of downcasting.
/// Unknown record type codes decode to `Null` so one unrecognized record
/// cannot abort enumeration of the rest of the file.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Null,
    Point(Point),
    MultiPoint(MultiPoint),
    PolyLine(PolyLine),
    Polygon(Polygon),
}

impl Shape {
    /// Short human-readable tag, used by the dump tool and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Null => "Null",
            Shape::Point(_) => "Point",
            Shape::MultiPoint(_) => "MultiPoint",
            Shape::PolyLine(_) => "PolyLine",
            Shape::Polygon(_) => "Polygon",
        }
    }

    /// Total vertex count across all parts.
    pub fn point_count(&self) -> usize {
        match self {
            Shape::Null => 0,
            Shape::Point(_) => 1,
            Shape::MultiPoint(m) => m.points.len(),
            Shape::PolyLine(p) => p.parts.iter().map(Vec::len).sum(),
            Shape::Polygon(p) => p.parts.iter().map(Vec::len).sum(),
        }
    }
}

/// The paired cursor's yielded value: one shape and its attribute row.
///
/// Constructed per advance and never mutated afterwards; the caller may
/// retain or discard it freely, the engine keeps no reference to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeUnit {
    /// Zero-based position in the enumeration order.
    pub ordinal: usize,
    /// One-based record number from the record's own header.
    pub record_number: i32,
    pub shape: Shape,
    pub attributes: AttributeRecord,
}
