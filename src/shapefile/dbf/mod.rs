//! The dBASE (.dbf) table engine: header, field descriptors and records.

pub mod header;
pub mod record;

use std::io::{Read, Seek, SeekFrom};

use encoding_rs::{Encoding, WINDOWS_1252};
use log::info;

use super::error::{Result, ShapefileError};

pub use header::{DbfHeader, FieldDescriptor, FieldFlags, FieldType};
pub use record::{AttributeRecord, AttributeValue};

/// Sequential reader over a dBASE attribute table.
///
/// Two record sequences are exposed: the *physical* one (`read_record`),
/// which yields every stored row including soft-deleted ones and is what the
/// shape-paired cursor consumes, and the *logical* one (`read_logical_record`
/// / [`Rows`]), which skips rows whose deletion marker is set.
#[derive(Debug)]
pub struct DbfReader<R: Read + Seek> {
    stream: R,
    header: DbfHeader,
    encoding: &'static Encoding,
    /// Physical records consumed since the last reset.
    position: u32,
}

impl<R: Read + Seek> DbfReader<R> {
    /// Parses the table header and positions the stream on the first record.
    ///
    /// Text fields decode through `user_encoding` when given, WINDOWS_1252
    /// otherwise (a strict ASCII superset covering the common legacy case).
    pub fn new(mut stream: R, user_encoding: Option<&'static Encoding>) -> Result<Self> {
        let encoding = user_encoding.unwrap_or(WINDOWS_1252);
        let header = DbfHeader::parse(&mut stream, encoding)?;
        info!(
            "dbase table open: {} records, {} public fields, encoding {}",
            header.record_count,
            header.field_names().count(),
            encoding.name()
        );
        Ok(Self {
            stream,
            header,
            encoding,
            position: 0,
        })
    }

    pub fn header(&self) -> &DbfHeader {
        &self.header
    }

    /// Declared physical record count, deleted rows included.
    pub fn record_count(&self) -> u32 {
        self.header.record_count
    }

    /// Public field names in table order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.header.field_names()
    }

    /// Position of a public field within decoded records, by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.header.field_index(name)
    }

    /// Reads the next physical record, deleted or not.
    ///
    /// Fails with `InvalidFormat` once the declared record count is
    /// exhausted; the paired cursor reports this when the geometry index
    /// declares more shapes than the table has rows.
    pub fn read_record(&mut self) -> Result<AttributeRecord> {
        if self.position >= self.header.record_count {
            return Err(ShapefileError::InvalidFormat(format!(
                "dbase table exhausted after {} records",
                self.header.record_count
            )));
        }
        let mut row = vec![0u8; self.header.record_length as usize];
        self.stream.read_exact(&mut row)?;
        self.position += 1;
        record::decode_record(&row, &self.header, self.encoding)
    }

    /// Reads the next record that is not soft-deleted, or `None` when the
    /// table is exhausted.
    pub fn read_logical_record(&mut self) -> Result<Option<AttributeRecord>> {
        while self.position < self.header.record_count {
            let record = self.read_record()?;
            if !record.is_deleted() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Rewinds to the first record.
    pub fn reset(&mut self) -> Result<()> {
        self.stream
            .seek(SeekFrom::Start(self.header.header_length as u64))?;
        self.position = 0;
        Ok(())
    }

    /// Iterator over the logical record sequence (soft-deleted rows skipped).
    pub fn rows(&mut self) -> Rows<'_, R> {
        Rows { reader: self }
    }
}

/// Iterator over non-deleted attribute records.
///
/// Continues from the reader's current position; call
/// [`DbfReader::reset`] first for a full pass.
pub struct Rows<'a, R: Read + Seek> {
    reader: &'a mut DbfReader<R>,
}

impl<R: Read + Seek> Iterator for Rows<'_, R> {
    type Item = Result<AttributeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_logical_record().transpose()
    }
}
