//! The top-level reader tying the main, index and attribute files together.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use encoding_rs::Encoding;
use log::{info, warn};

use super::dbf::DbfReader;
use super::error::{Result, ShapefileError};
use super::header::{self, HEADER_LENGTH};
use super::index::ShapeLocator;
use super::iter::Units;
use super::models::{BoundingBox, FileHeader, ShapeType, ShapeUnit};
use super::shapes;

/// Cursor position within the paired enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    NotStarted,
    Positioned(usize),
    Exhausted,
}

/// A readonly cursor over an ESRI Shapefile triad.
///
/// Owns the three underlying streams for its lifetime; they are released
/// together when the reader is dropped or [`close`](Self::close)d, on every
/// exit path. The cursor advances ordinally: each step seeks the main file
/// through the index and reads the next attribute record sequentially, so a
/// reader must not be shared between threads. Concurrent iteration requires
/// independently opened streams per consumer.
///
/// Shape ordinal `i` is paired with dBASE *physical* record `i`, whether or
/// not that row carries the deletion marker; the marker is exposed through
/// [`AttributeRecord::is_deleted`](super::dbf::AttributeRecord::is_deleted).
/// Skipping deleted rows here would shift attributes onto the wrong shapes,
/// because the geometry index knows nothing about deletion.
#[derive(Debug)]
pub struct ShapefileReader<R: Read + Seek> {
    main: R,
    dbf: DbfReader<R>,
    locator: ShapeLocator,
    main_header: FileHeader,
    state: CursorState,
    current: Option<ShapeUnit>,
}

impl ShapefileReader<File> {
    /// Opens the triad from a base path.
    ///
    /// `path` may point at any of the three files (or carry any extension);
    /// the `.shp`, `.shx` and `.dbf` siblings are resolved from it. All
    /// three must exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let main_path = path.with_extension("shp");
        let index_path = path.with_extension("shx");
        let dbf_path = path.with_extension("dbf");

        for required in [&main_path, &index_path, &dbf_path] {
            if !required.exists() {
                return Err(ShapefileError::MissingFile(required.clone()));
            }
        }

        info!("Opening shapefile triad: {}", main_path.display());
        Self::from_streams(
            File::open(&main_path)?,
            File::open(&index_path)?,
            File::open(&dbf_path)?,
            None,
        )
    }
}

impl<R: Read + Seek> ShapefileReader<R> {
    /// Opens the triad from three already-open streams.
    ///
    /// Each stream must be positioned at byte 0. `user_encoding` overrides
    /// the dBASE text encoding (WINDOWS_1252 when `None`).
    ///
    /// # Errors
    /// Construction fails if a stream is shorter than its format-mandated
    /// header, the main file's shape type code is unknown, the index is
    /// shorter than its declared length, or any index entry addresses bytes
    /// past the end of the main file. Count disagreements between the index
    /// and the attribute table are reported as a warning, never by silently
    /// truncating either sequence.
    pub fn from_streams(
        mut main: R,
        mut index: R,
        dbf: R,
        user_encoding: Option<&'static Encoding>,
    ) -> Result<Self> {
        let main_len = stream_len(&mut main)?;
        let index_len = stream_len(&mut index)?;

        let main_header = read_header(&mut main, main_len, "main")?;
        let index_header = read_header(&mut index, index_len, "index")?;

        let declared_main = main_header.file_length_words as u64 * 2;
        if declared_main != main_len {
            warn!(
                "main file declares {} bytes but the stream has {}",
                declared_main, main_len
            );
        }

        let locator = ShapeLocator::parse(&mut index, &index_header, index_len)?;
        locator.validate_against(main_len)?;

        let dbf = DbfReader::new(dbf, user_encoding)?;
        if dbf.record_count() as usize != locator.len() {
            warn!(
                "index declares {} shapes but the attribute table has {} records",
                locator.len(),
                dbf.record_count()
            );
        }

        info!(
            "shapefile open: {:?}, {} shapes, {} attribute fields",
            main_header.shape_type,
            locator.len(),
            dbf.field_names().count()
        );

        Ok(Self {
            main,
            dbf,
            locator,
            main_header,
            state: CursorState::NotStarted,
            current: None,
        })
    }

    /// Number of shapes, as declared by the index file. Independent of the
    /// attribute table's record count.
    pub fn count(&self) -> usize {
        self.locator.len()
    }

    /// Bounding box over all shapes, from the main file header.
    pub fn bounding_box(&self) -> BoundingBox {
        self.main_header.bounding_box
    }

    /// The file-level shape type. Individual records may still be Null.
    pub fn shape_type(&self) -> ShapeType {
        self.main_header.shape_type
    }

    /// The parsed main file header, including Z/M ranges.
    pub fn main_header(&self) -> &FileHeader {
        &self.main_header
    }

    /// Public attribute field names, in table order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.dbf.field_names()
    }

    /// Position of a public attribute field within records, by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.dbf.field_index(name)
    }

    /// Advances to the next ordinal, decoding its shape and attribute row.
    ///
    /// Returns `Ok(false)` once the declared shape count is reached; further
    /// calls keep returning `Ok(false)`.
    pub fn advance(&mut self) -> Result<bool> {
        match self.next_unit()? {
            Some(unit) => {
                self.current = Some(unit);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The unit produced by the last successful [`advance`](Self::advance).
    ///
    /// Calling this before the first advance, after exhaustion, or after the
    /// unit was taken by an iterator is a usage error.
    pub fn current(&self) -> Result<&ShapeUnit> {
        self.current
            .as_ref()
            .ok_or(ShapefileError::CursorNotPositioned)
    }

    /// Returns the cursor to the position before the first record.
    pub fn reset(&mut self) -> Result<()> {
        self.dbf.reset()?;
        self.state = CursorState::NotStarted;
        self.current = None;
        Ok(())
    }

    /// Closes the reader, releasing all three streams together.
    pub fn close(self) {}

    /// Iterator over the remaining units. Yields owned [`ShapeUnit`]s;
    /// bounded by [`count`](Self::count).
    pub fn units(&mut self) -> Units<'_, R> {
        Units::new(self)
    }

    /// Decodes the unit at the next ordinal, or `None` past the end.
    pub(crate) fn next_unit(&mut self) -> Result<Option<ShapeUnit>> {
        self.current = None;
        let ordinal = match self.state {
            CursorState::NotStarted => 0,
            CursorState::Positioned(i) => i + 1,
            CursorState::Exhausted => return Ok(None),
        };
        if ordinal >= self.locator.len() {
            self.state = CursorState::Exhausted;
            return Ok(None);
        }

        let (offset, length) = self.locator.locate(ordinal)?;
        self.main.seek(SeekFrom::Start(offset))?;
        let mut record = vec![0u8; length];
        self.main.read_exact(&mut record)?;
        let (record_number, shape) = shapes::decode_record(ordinal, &record)?;

        let attributes = self.dbf.read_record()?;

        self.state = CursorState::Positioned(ordinal);
        Ok(Some(ShapeUnit {
            ordinal,
            record_number,
            shape,
            attributes,
        }))
    }
}

fn stream_len<R: Read + Seek>(stream: &mut R) -> Result<u64> {
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(0))?;
    Ok(len)
}

fn read_header<R: Read>(stream: &mut R, stream_len: u64, file: &'static str) -> Result<FileHeader> {
    if stream_len < HEADER_LENGTH as u64 {
        return Err(ShapefileError::TruncatedHeader {
            file,
            expected: HEADER_LENGTH as u64,
            found: stream_len,
        });
    }
    let mut buf = [0u8; HEADER_LENGTH];
    stream.read_exact(&mut buf)?;
    header::parse(&buf, file)
}
