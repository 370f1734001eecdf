//! # shapefile-reader
//!
//! A reader for ESRI Shapefile triads: the co-named .shp (geometry),
//! .shx (record index) and .dbf (dBASE attribute table) files that together
//! describe one vector dataset.
//!
//! The reader decodes the triad into a forward-streamed sequence of
//! (geometry, attributes) pairs. It is a decoding engine only: no coordinate
//! transformation, no geometry repair, no write support.
pub mod shapefile;

// Re-export the main types for convenience
pub use shapefile::{
    dbf::{AttributeRecord, AttributeValue, DbfReader, FieldDescriptor, FieldFlags, FieldType},
    models::{
        BoundingBox, FileHeader, IndexEntry, MultiPoint, Point, PolyLine, Polygon, Shape,
        ShapeType, ShapeUnit,
    },
    Result, ShapefileError, ShapefileReader, Units,
};
