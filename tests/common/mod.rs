//! Synthetic triad encoders shared by the integration tests.
//!
//! Fixtures are built in memory with the same byte layouts the reader
//! decodes: big-endian lengths and index entries, little-endian record
//! payloads, fixed-width dBASE rows.
#![allow(dead_code)]

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

/// Encodes a 100-byte .shp/.shx header.
pub fn file_header(shape_type: i32, file_length_words: u32, bbox: [f64; 4]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(100);
    buf.write_i32::<BigEndian>(9994).unwrap();
    for _ in 0..5 {
        buf.write_i32::<BigEndian>(0).unwrap();
    }
    buf.write_u32::<BigEndian>(file_length_words).unwrap();
    buf.write_i32::<LittleEndian>(1000).unwrap();
    buf.write_i32::<LittleEndian>(shape_type).unwrap();
    for value in bbox {
        buf.write_f64::<LittleEndian>(value).unwrap();
    }
    for _ in 0..4 {
        buf.write_f64::<LittleEndian>(0.0).unwrap();
    }
    assert_eq!(buf.len(), 100);
    buf
}

/// Wraps a type code and payload in an 8-byte record header.
pub fn wrap_record(record_number: i32, type_code: i32, payload: &[u8]) -> Vec<u8> {
    assert_eq!(payload.len() % 2, 0, "payloads are whole 16-bit words");
    let mut buf = Vec::with_capacity(12 + payload.len());
    buf.write_i32::<BigEndian>(record_number).unwrap();
    buf.write_i32::<BigEndian>((4 + payload.len()) as i32 / 2).unwrap();
    buf.write_i32::<LittleEndian>(type_code).unwrap();
    buf.extend_from_slice(payload);
    buf
}

pub fn point_payload(x: f64, y: f64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_f64::<LittleEndian>(x).unwrap();
    buf.write_f64::<LittleEndian>(y).unwrap();
    buf
}

/// Payload shared by PolyLine (3) and Polygon (5) records.
pub fn poly_payload(bbox: [f64; 4], parts: &[Vec<(f64, f64)>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for value in bbox {
        buf.write_f64::<LittleEndian>(value).unwrap();
    }
    buf.write_i32::<LittleEndian>(parts.len() as i32).unwrap();
    let total: usize = parts.iter().map(Vec::len).sum();
    buf.write_i32::<LittleEndian>(total as i32).unwrap();
    let mut start = 0i32;
    for part in parts {
        buf.write_i32::<LittleEndian>(start).unwrap();
        start += part.len() as i32;
    }
    for part in parts {
        for &(x, y) in part {
            buf.write_f64::<LittleEndian>(x).unwrap();
            buf.write_f64::<LittleEndian>(y).unwrap();
        }
    }
    buf
}

/// Appends a Z or M block (range followed by one value per vertex).
pub fn measure_block(buf: &mut Vec<u8>, range: (f64, f64), values: &[f64]) {
    buf.write_f64::<LittleEndian>(range.0).unwrap();
    buf.write_f64::<LittleEndian>(range.1).unwrap();
    for &value in values {
        buf.write_f64::<LittleEndian>(value).unwrap();
    }
}

/// Concatenates records into a .shp stream and derives its .shx twin.
///
/// Index entries are big-endian, as the format demands.
pub fn build_main_and_index(shape_type: i32, records: &[Vec<u8>]) -> (Vec<u8>, Vec<u8>) {
    let body_len: usize = records.iter().map(Vec::len).sum();
    let main_words = ((100 + body_len) / 2) as u32;
    let index_words = (100 / 2 + records.len() * 4) as u32;

    let mut main = file_header(shape_type, main_words, [0.0, 0.0, 100.0, 100.0]);
    let mut index = file_header(shape_type, index_words, [0.0, 0.0, 100.0, 100.0]);

    let mut offset_words = 50u32;
    for record in records {
        index.write_u32::<BigEndian>(offset_words).unwrap();
        index
            .write_u32::<BigEndian>((record.len() as u32 - 8) / 2)
            .unwrap();
        offset_words += record.len() as u32 / 2;
        main.extend_from_slice(record);
    }
    (main, index)
}

/// A column definition for the synthetic .dbf builder.
pub struct DbfField {
    pub name: &'static str,
    pub type_code: u8,
    pub length: u8,
    pub decimal_count: u8,
    pub flags: u8,
}

impl DbfField {
    pub fn new(name: &'static str, type_code: u8, length: u8) -> Self {
        Self {
            name,
            type_code,
            length,
            decimal_count: 0,
            flags: 0,
        }
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }
}

/// Builds a .dbf stream. Each row is `(deleted, field values)`; values
/// shorter than the field width are right-padded with spaces.
pub fn build_dbf(fields: &[DbfField], rows: &[(bool, Vec<Vec<u8>>)]) -> Vec<u8> {
    let header_length = 32 + 32 * fields.len() + 1;
    let record_length: usize = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();

    let mut buf = Vec::new();
    buf.push(0x03); // dBASE III, no memo
    buf.extend_from_slice(&[124, 1, 1]); // last update 2024-01-01
    buf.write_i32::<LittleEndian>(rows.len() as i32).unwrap();
    buf.write_u16::<LittleEndian>(header_length as u16).unwrap();
    buf.write_u16::<LittleEndian>(record_length as u16).unwrap();
    buf.extend_from_slice(&[0u8; 20]);
    assert_eq!(buf.len(), 32);

    for field in fields {
        let mut descriptor = [0u8; 32];
        descriptor[..field.name.len()].copy_from_slice(field.name.as_bytes());
        descriptor[11] = field.type_code;
        descriptor[16] = field.length;
        descriptor[17] = field.decimal_count;
        descriptor[18] = field.flags;
        buf.extend_from_slice(&descriptor);
    }
    buf.push(0x0D);

    for (deleted, values) in rows {
        assert_eq!(values.len(), fields.len());
        buf.push(if *deleted { b'*' } else { b' ' });
        for (field, value) in fields.iter().zip(values) {
            let mut cell = value.clone();
            assert!(cell.len() <= field.length as usize);
            cell.resize(field.length as usize, b' ');
            buf.extend_from_slice(&cell);
        }
    }
    buf
}
