//! Iterator adapter over the paired cursor.

use std::io::{Read, Seek};

use super::error::Result;
use super::models::ShapeUnit;
use super::reader::ShapefileReader;

/// Iterator over `(shape, attributes)` units.
///
/// Drives the reader's cursor, so it continues from wherever the cursor
/// stands; call [`ShapefileReader::reset`] first for a full pass. The
/// sequence is finite, bounded by [`ShapefileReader::count`].
///
/// Created by [`ShapefileReader::units`].
pub struct Units<'a, R: Read + Seek> {
    reader: &'a mut ShapefileReader<R>,
}

impl<'a, R: Read + Seek> Units<'a, R> {
    pub(super) fn new(reader: &'a mut ShapefileReader<R>) -> Self {
        Self { reader }
    }
}

impl<R: Read + Seek> Iterator for Units<'_, R> {
    type Item = Result<ShapeUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_unit().transpose()
    }
}
