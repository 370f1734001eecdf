//! dBASE record decoding: per-field typed values with null/default policy.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use encoding_rs::Encoding;
use log::warn;

use crate::shapefile::error::{Result, ShapefileError};
use crate::shapefile::utils::trim_field;

use super::header::{DbfHeader, FieldType, DELETED_MARKER};

/// A single decoded attribute value.
///
/// `N`, `F`, `Y` and `B` columns all decode to `Numeric`; they are stored as
/// decimal text in the file and differ only in how the producing application
/// typed them. A numeric field whose text does not parse keeps the original
/// text as `Character`. `Raw` carries memo/general/picture spans and any
/// unrecognized column type untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Character(String),
    Numeric(f64),
    Integer(i32),
    Logical(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Raw(Vec<u8>),
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "NULL"),
            AttributeValue::Character(s) => write!(f, "{}", s),
            AttributeValue::Numeric(v) => write!(f, "{}", v),
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Logical(v) => write!(f, "{}", v),
            AttributeValue::Date(d) => write!(f, "{}", d),
            AttributeValue::DateTime(t) => write!(f, "{}", t),
            AttributeValue::Raw(bytes) => write!(f, "<{} raw bytes>", bytes.len()),
        }
    }
}

/// One decoded attribute row: field name / value pairs in table order,
/// system fields excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    deleted: bool,
    fields: Vec<(String, AttributeValue)>,
}

impl AttributeRecord {
    /// True if the row carries the `*` soft-deletion marker.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Value of the named field, if the table has it.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Value at the given public-field position.
    pub fn get_at(&self, index: usize) -> Option<&AttributeValue> {
        self.fields.get(index).map(|(_, v)| v)
    }

    /// Field name / value pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decodes one raw record of `header.record_length` bytes.
///
/// Byte 0 is the deletion marker; each field then occupies its declared byte
/// span in descriptor order. System fields are walked over for their span but
/// produce no value.
pub fn decode_record(
    row: &[u8],
    header: &DbfHeader,
    encoding: &'static Encoding,
) -> Result<AttributeRecord> {
    if row.len() < header.record_length as usize {
        return Err(ShapefileError::InvalidFormat(format!(
            "dbase record has {} bytes, expected {}",
            row.len(),
            header.record_length
        )));
    }

    let deleted = row[0] == DELETED_MARKER;
    let mut fields = Vec::with_capacity(header.fields.len());
    let mut position = 1;

    for field in &header.fields {
        let end = (position + field.length).min(row.len());
        let raw = &row[position..end];
        position = end;

        if field.flags.system {
            continue;
        }

        let value = decode_field(raw, field.field_type, field.flags.nulls_allowed, encoding);
        fields.push((field.name.clone(), value));
    }

    Ok(AttributeRecord { deleted, fields })
}

/// Applies the per-type decode rule and null/blank policy to one field span.
fn decode_field(
    raw: &[u8],
    field_type: FieldType,
    nulls_allowed: bool,
    encoding: &'static Encoding,
) -> AttributeValue {
    let trimmed = trim_field(raw);
    let blank = trimmed.is_empty();

    match field_type {
        FieldType::Character => {
            let (text, _, _) = encoding.decode(trimmed);
            AttributeValue::Character(text.into_owned())
        }

        FieldType::Numeric | FieldType::Float | FieldType::Currency | FieldType::Double => {
            if blank {
                return blank_value(nulls_allowed, AttributeValue::Numeric(0.0));
            }
            let (text, _, _) = encoding.decode(trimmed);
            match text.parse::<f64>() {
                Ok(value) => AttributeValue::Numeric(value),
                // Unparseable numeric text is kept verbatim.
                Err(_) => AttributeValue::Character(text.into_owned()),
            }
        }

        FieldType::Integer => {
            if blank || raw.len() < 4 {
                return blank_value(nulls_allowed, AttributeValue::Integer(0));
            }
            AttributeValue::Integer(LittleEndian::read_i32(&raw[..4]))
        }

        FieldType::Logical => {
            if blank {
                return blank_value(nulls_allowed, AttributeValue::Logical(false));
            }
            AttributeValue::Logical(matches!(trimmed[0], b'T' | b't' | b'Y' | b'y'))
        }

        FieldType::Date => {
            if blank {
                return blank_value(nulls_allowed, AttributeValue::Date(NaiveDate::MIN));
            }
            let (text, _, _) = encoding.decode(trimmed);
            match parse_yyyymmdd(&text) {
                Some(date) => AttributeValue::Date(date),
                None => AttributeValue::Character(text.into_owned()),
            }
        }

        FieldType::DateTime => {
            let packed = if raw.len() >= 8 {
                LittleEndian::read_i64(&raw[..8])
            } else {
                0
            };
            if blank || packed == 0 {
                return blank_value(nulls_allowed, AttributeValue::DateTime(NaiveDateTime::MIN));
            }
            AttributeValue::DateTime(packed_datetime(packed))
        }

        FieldType::Memo | FieldType::General | FieldType::Picture => {
            AttributeValue::Raw(raw.to_vec())
        }

        FieldType::Unknown(code) => {
            warn!("unhandled dbase field type {:#04x}, preserving raw bytes", code);
            AttributeValue::Raw(raw.to_vec())
        }
    }
}

fn blank_value(nulls_allowed: bool, default: AttributeValue) -> AttributeValue {
    if nulls_allowed {
        AttributeValue::Null
    } else {
        default
    }
}

fn parse_yyyymmdd(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Splits a packed `T` value: high 32 bits Julian day number, low 32 bits
/// milliseconds since midnight.
fn packed_datetime(packed: i64) -> NaiveDateTime {
    let julian_day = packed >> 32;
    let millis = (packed & 0xFFFF_FFFF) as u32;
    let date = julian_day_to_date(julian_day);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(millis / 1000, (millis % 1000) * 1_000_000)
        .unwrap_or(NaiveTime::MIN);
    NaiveDateTime::new(date, time)
}

/// Converts a Julian day number to a Gregorian calendar date.
///
/// Standard integer algorithm (Fliegel and Van Flandern). Day 0 and any
/// value outside the representable calendar range map to the minimum
/// sentinel date, matching the blank-field default.
pub fn julian_day_to_date(julian_day: i64) -> NaiveDate {
    if julian_day <= 0 {
        return NaiveDate::MIN;
    }
    let p = julian_day;
    let s1 = p + 68569;
    let n = 4 * s1 / 146097;
    let s2 = s1 - (146097 * n + 3) / 4;
    let i = 4000 * (s2 + 1) / 1461001;
    let s3 = s2 - 1461 * i / 4 + 31;
    let q = 80 * s3 / 2447;
    let d = s3 - 2447 * q / 80;
    let s4 = q / 11;
    let m = q + 2 - 12 * s4;
    let j = 100 * (n - 49) + i + s4;

    match (i32::try_from(j), u32::try_from(m), u32::try_from(d)) {
        (Ok(year), Ok(month), Ok(day)) => {
            NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
        }
        _ => NaiveDate::MIN,
    }
}
