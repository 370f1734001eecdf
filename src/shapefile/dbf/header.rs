//! dBASE table header and field descriptor parsing.

use std::collections::HashMap;
use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::Encoding;
use log::{debug, trace, warn};

use crate::shapefile::error::{Result, ShapefileError};

/// Size of the fixed header at the start of a .dbf file.
pub const DBF_HEADER_LENGTH: usize = 32;

/// Size of one field descriptor in the descriptor array.
pub const FIELD_DESCRIPTOR_LENGTH: usize = 32;

/// Byte that terminates the field descriptor array.
const DESCRIPTOR_TERMINATOR: u8 = 0x0D;

/// Marker byte flagging a record as soft-deleted.
pub const DELETED_MARKER: u8 = b'*';

/// dBASE column type codes.
///
/// Unrecognized codes are carried as `Unknown` so their raw bytes can still
/// be preserved at record decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Character,
    Currency,
    Numeric,
    Float,
    Date,
    DateTime,
    Double,
    Integer,
    Logical,
    Memo,
    General,
    Picture,
    Unknown(u8),
}

impl From<u8> for FieldType {
    fn from(code: u8) -> Self {
        match code {
            b'C' => Self::Character,
            b'Y' => Self::Currency,
            b'N' => Self::Numeric,
            b'F' => Self::Float,
            b'D' => Self::Date,
            b'T' => Self::DateTime,
            b'B' => Self::Double,
            b'I' => Self::Integer,
            b'L' => Self::Logical,
            b'M' => Self::Memo,
            b'G' => Self::General,
            b'P' => Self::Picture,
            other => Self::Unknown(other),
        }
    }
}

/// Field descriptor flag bits.
///
/// Bit 0x01: system column (hidden from the public field list)
/// Bit 0x02: NULL values allowed
/// Bit 0x04: binary column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldFlags {
    pub system: bool,
    pub nulls_allowed: bool,
    pub binary: bool,
}

impl From<u8> for FieldFlags {
    fn from(bits: u8) -> Self {
        Self {
            system: bits & 0x01 != 0,
            nulls_allowed: bits & 0x02 != 0,
            binary: bits & 0x04 != 0,
        }
    }
}

/// One column of the attribute table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    /// Width of the field's byte span within each record.
    pub length: usize,
    pub decimal_count: u8,
    pub flags: FieldFlags,
}

/// Parsed .dbf header: fixed part plus the field descriptor array.
///
/// System-flagged fields are kept in `fields` so record byte offsets stay
/// correct, but they are excluded from the public field list and from
/// decoded attribute records.
#[derive(Debug)]
pub struct DbfHeader {
    pub version: u8,
    /// Last update date as stored: (1900-offset year resolved, month, day).
    /// Not validated as a calendar date.
    pub last_update: (u16, u8, u8),
    pub record_count: u32,
    pub header_length: u16,
    pub record_length: u16,
    pub table_flags: u8,
    pub code_page: u8,
    /// All fields in table order, system fields included.
    pub fields: Vec<FieldDescriptor>,
    /// Public field name -> position in the public (non-system) field list.
    name_index: HashMap<String, usize>,
}

impl DbfHeader {
    /// Parses the header from the start of a .dbf stream, leaving the stream
    /// positioned on the first record.
    ///
    /// # Header Structure
    /// ```text
    /// [ 1 byte ] Version
    /// [ 3 bytes] Last update date: year since 1900, month, day
    /// [ 4 bytes] Record count (little-endian i32)
    /// [ 2 bytes] Header length (little-endian i16)
    /// [ 2 bytes] Record length (little-endian i16)
    /// [16 bytes] Reserved
    /// [ 1 byte ] Table flags
    /// [ 1 byte ] Code page mark
    /// [ 2 bytes] Reserved
    /// ```
    /// followed by 32-byte field descriptors up to a 0x0D terminator and, on
    /// Visual FoxPro files, a 263-byte backlink block. Everything between the
    /// terminator and `header_length` is skipped, so the declared header
    /// length is authoritative for where records begin.
    pub fn parse<R: Read>(stream: &mut R, encoding: &'static Encoding) -> Result<Self> {
        let mut fixed = [0u8; DBF_HEADER_LENGTH];
        read_exact_or_truncated(stream, &mut fixed, 0)?;

        let version = fixed[0];
        let last_update = (1900 + fixed[1] as u16, fixed[2], fixed[3]);
        let record_count = LittleEndian::read_i32(&fixed[4..8]).max(0) as u32;
        let header_length = LittleEndian::read_u16(&fixed[8..10]);
        let record_length = LittleEndian::read_u16(&fixed[10..12]);
        let table_flags = fixed[28];
        let code_page = fixed[29];

        if (header_length as usize) < DBF_HEADER_LENGTH + 1 {
            return Err(ShapefileError::InvalidFormat(format!(
                "dbase header length {} cannot hold the fixed header",
                header_length
            )));
        }

        // Read the rest of the declared header in one piece; descriptors are
        // parsed out of it and the remainder (terminator, backlink) ignored.
        let mut descriptor_region = vec![0u8; header_length as usize - DBF_HEADER_LENGTH];
        read_exact_or_truncated(stream, &mut descriptor_region, DBF_HEADER_LENGTH as u64)?;

        let fields = parse_descriptors(&descriptor_region, encoding)?;

        let span: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
        if span != record_length as usize {
            warn!(
                "field lengths sum to {} bytes per record but the header declares {}",
                span, record_length
            );
        }

        let mut name_index = HashMap::new();
        for (i, field) in fields.iter().filter(|f| !f.flags.system).enumerate() {
            if name_index.contains_key(&field.name) {
                warn!("duplicate field name {:?}; keeping the first occurrence", field.name);
            } else {
                name_index.insert(field.name.clone(), i);
            }
        }

        debug!(
            "dbase header: version {:#04x}, {} records of {} bytes, {} fields ({} public)",
            version,
            record_count,
            record_length,
            fields.len(),
            name_index.len()
        );

        Ok(Self {
            version,
            last_update,
            record_count,
            header_length,
            record_length,
            table_flags,
            code_page,
            fields,
            name_index,
        })
    }

    /// Names of the public (non-system) fields, in table order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| !f.flags.system)
            .map(|f| f.name.as_str())
    }

    /// Position of a public field in the decoded attribute record, by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }
}

/// Walks the 32-byte descriptors until the 0x0D terminator.
///
/// # Descriptor Structure
/// ```text
/// [11 bytes] Field name, NUL-padded
/// [ 1 byte ] Type code (ASCII letter)
/// [ 4 bytes] Field address (ignored)
/// [ 1 byte ] Field length
/// [ 1 byte ] Decimal count
/// [ 1 byte ] Flags
/// [ 4 bytes] Autoincrement next value (ignored)
/// [ 1 byte ] Autoincrement step (ignored)
/// [ 8 bytes] Reserved
/// ```
fn parse_descriptors(region: &[u8], encoding: &'static Encoding) -> Result<Vec<FieldDescriptor>> {
    let mut fields = Vec::new();
    let mut offset = 0;

    loop {
        let Some(&first) = region.get(offset) else {
            return Err(ShapefileError::InvalidFormat(
                "field descriptor array is missing its terminator".to_string(),
            ));
        };
        if first == DESCRIPTOR_TERMINATOR {
            break;
        }
        let Some(raw) = region.get(offset..offset + FIELD_DESCRIPTOR_LENGTH) else {
            return Err(ShapefileError::InvalidFormat(format!(
                "field descriptor at offset {} is truncated",
                offset
            )));
        };

        let name_end = raw[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let (name, _, _) = encoding.decode(&raw[..name_end]);
        let name = name.trim().to_string();
        let field_type = FieldType::from(raw[11]);
        let length = raw[16] as usize;
        let decimal_count = raw[17];
        let flags = FieldFlags::from(raw[18]);

        trace!(
            "field {:?}: type {:?}, {} bytes, {} decimals, flags {:?}",
            name,
            field_type,
            length,
            decimal_count,
            flags
        );

        fields.push(FieldDescriptor {
            name,
            field_type,
            length,
            decimal_count,
            flags,
        });
        offset += FIELD_DESCRIPTOR_LENGTH;
    }

    Ok(fields)
}

fn read_exact_or_truncated<R: Read>(stream: &mut R, buf: &mut [u8], at: u64) -> Result<()> {
    stream.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ShapefileError::TruncatedHeader {
                file: "dbase",
                expected: at + buf.len() as u64,
                found: at,
            }
        } else {
            ShapefileError::Io(e)
        }
    })
}
