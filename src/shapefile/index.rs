//! Index (.shx) parsing: the table of shape record locations.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, warn};

use super::error::{Result, ShapefileError};
use super::header::HEADER_LENGTH;
use super::models::{FileHeader, IndexEntry};

/// Random-access table mapping shape ordinals to main-file byte ranges.
///
/// Built once from the index stream. `locate` is O(1); no scanning of the
/// main file is ever required.
#[derive(Debug)]
pub struct ShapeLocator {
    entries: Vec<IndexEntry>,
}

impl ShapeLocator {
    /// Reads the entry table that follows the index file's 100-byte header.
    ///
    /// # Entry Structure
    /// ```text
    /// [4 bytes] Record offset in 16-bit words (big-endian u32)
    /// [4 bytes] Record content length in 16-bit words (big-endian u32)
    /// ```
    ///
    /// Entries are big-endian while record payloads in the main file are
    /// little-endian; reading these words with the wrong byte order produces
    /// offsets far outside the main file, which `validate_against` rejects.
    ///
    /// The entry count is derived from the header's declared file length:
    /// `(file_length_words - 50) / 4`, 50 words being the header itself and
    /// 4 words one entry. The stream must carry exactly that many entries.
    pub fn parse<R: Read>(stream: &mut R, header: &FileHeader, stream_len: u64) -> Result<Self> {
        let declared_bytes = header.file_length_words as u64 * 2;
        if declared_bytes < HEADER_LENGTH as u64 {
            return Err(ShapefileError::TruncatedHeader {
                file: "index",
                expected: HEADER_LENGTH as u64,
                found: declared_bytes,
            });
        }
        if stream_len < declared_bytes {
            return Err(ShapefileError::LengthMismatch {
                file: "index",
                declared: declared_bytes,
                actual: stream_len,
            });
        }
        if stream_len != declared_bytes {
            warn!(
                "index stream is {} bytes but declares {}; trusting the declared length",
                stream_len, declared_bytes
            );
        }

        let count = ((header.file_length_words - 50) / 4) as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let offset_words = stream.read_u32::<BigEndian>()?;
            let content_length_words = stream.read_u32::<BigEndian>()?;
            entries.push(IndexEntry {
                offset_words,
                content_length_words,
            });
        }

        debug!("index parsed: {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Number of shape records the index declares.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Main-file byte range for the given ordinal: (offset, length including
    /// the record's own 8-byte header).
    pub fn locate(&self, ordinal: usize) -> Result<(u64, usize)> {
        let entry = self
            .entries
            .get(ordinal)
            .ok_or(ShapefileError::OrdinalOutOfRange {
                ordinal,
                count: self.entries.len(),
            })?;
        Ok((entry.byte_offset(), entry.byte_length()))
    }

    /// Checks every entry's byte range against the actual main file length.
    ///
    /// An entry that extends past the end of the main file makes offsets
    /// unreadable, so this is fatal at open time.
    pub fn validate_against(&self, main_len: u64) -> Result<()> {
        for (ordinal, entry) in self.entries.iter().enumerate() {
            let end = entry.byte_offset() + entry.byte_length() as u64;
            if end > main_len {
                return Err(ShapefileError::InvalidFormat(format!(
                    "index entry {} addresses bytes {}..{} but the main file has only {} bytes",
                    ordinal,
                    entry.byte_offset(),
                    end,
                    main_len
                )));
            }
        }
        Ok(())
    }
}
