mod common;

use std::fs;
use std::io::Cursor;

use byteorder::{LittleEndian, WriteBytesExt};
use shapefile_reader::shapefile::shapes;
use shapefile_reader::{AttributeValue, Point, Shape, ShapefileError, ShapefileReader, ShapeType};

use common::{
    build_dbf, build_main_and_index, file_header, measure_block, point_payload, poly_payload,
    wrap_record, DbfField,
};

fn point_triad() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let records = vec![
        wrap_record(1, 1, &point_payload(1.0, 2.0)),
        wrap_record(2, 1, &point_payload(3.0, 4.0)),
        wrap_record(3, 1, &point_payload(5.0, 6.0)),
    ];
    let (main, index) = build_main_and_index(1, &records);
    let fields = [
        DbfField::new("NAME", b'C', 10),
        DbfField::new("VALUE", b'N', 8),
    ];
    let rows = vec![
        (false, vec![b"alpha".to_vec(), b"1".to_vec()]),
        (false, vec![b"beta".to_vec(), b"2".to_vec()]),
        (false, vec![b"gamma".to_vec(), b"3".to_vec()]),
    ];
    (main, index, build_dbf(&fields, &rows))
}

fn open(triad: (Vec<u8>, Vec<u8>, Vec<u8>)) -> ShapefileReader<Cursor<Vec<u8>>> {
    ShapefileReader::from_streams(
        Cursor::new(triad.0),
        Cursor::new(triad.1),
        Cursor::new(triad.2),
        None,
    )
    .expect("open triad")
}

#[test]
fn cursor_yields_count_units_then_stops() {
    let mut reader = open(point_triad());

    assert_eq!(reader.count(), 3);
    assert_eq!(reader.shape_type(), ShapeType::Point);
    let bounds = reader.bounding_box();
    assert_eq!(
        (bounds.x_min, bounds.y_min, bounds.x_max, bounds.y_max),
        (0.0, 0.0, 100.0, 100.0)
    );
    let names: Vec<&str> = reader.field_names().collect();
    assert_eq!(names, ["NAME", "VALUE"]);

    // current() before the first advance is a usage error.
    assert!(matches!(
        reader.current(),
        Err(ShapefileError::CursorNotPositioned)
    ));

    let expected = [
        (1.0, 2.0, "alpha", 1.0),
        (3.0, 4.0, "beta", 2.0),
        (5.0, 6.0, "gamma", 3.0),
    ];
    for (ordinal, (x, y, name, value)) in expected.iter().enumerate() {
        assert!(reader.advance().expect("advance"), "advance {}", ordinal);
        let unit = reader.current().expect("current");
        assert_eq!(unit.ordinal, ordinal);
        assert_eq!(unit.record_number, ordinal as i32 + 1);
        match &unit.shape {
            Shape::Point(p) => assert_eq!((p.x, p.y), (*x, *y)),
            other => panic!("expected a point at ordinal {}, got {:?}", ordinal, other),
        }
        assert_eq!(
            unit.attributes.get("NAME"),
            Some(&AttributeValue::Character(name.to_string()))
        );
        assert_eq!(
            unit.attributes.get("VALUE"),
            Some(&AttributeValue::Numeric(*value))
        );
    }

    assert!(!reader.advance().expect("advance past end"));
    assert!(!reader.advance().expect("advance stays exhausted"));
    assert!(matches!(
        reader.current(),
        Err(ShapefileError::CursorNotPositioned)
    ));
}

#[test]
fn polygon_two_ring_round_trip() {
    // Clockwise outer boundary, counter-clockwise hole.
    let outer = vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)];
    let inner = vec![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)];
    let payload = poly_payload([0.0, 0.0, 10.0, 10.0], &[outer.clone(), inner.clone()]);
    let record = wrap_record(1, 5, &payload);

    let (record_number, shape) = shapes::decode_record(0, &record).expect("decode");
    assert_eq!(record_number, 1);

    let polygon = match shape {
        Shape::Polygon(p) => p,
        other => panic!("expected a polygon, got {:?}", other),
    };
    assert_eq!(polygon.parts.len(), 2);
    let as_points = |ring: &[(f64, f64)]| -> Vec<Point> {
        ring.iter().map(|&(x, y)| Point::new(x, y)).collect()
    };
    assert_eq!(polygon.parts[0], as_points(&outer));
    assert_eq!(polygon.parts[1], as_points(&inner));
    assert_eq!(polygon.z_range, None);
    assert_eq!(polygon.m_range, None);
}

#[test]
fn polyline_z_carries_both_channels() {
    let part = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)];
    let mut payload = poly_payload([0.0, 0.0, 2.0, 1.0], &[part]);
    measure_block(&mut payload, (5.0, 7.0), &[5.0, 6.0, 7.0]);
    measure_block(&mut payload, (0.1, 0.3), &[0.1, 0.2, 0.3]);
    let records = vec![wrap_record(1, 13, &payload)];
    let (main, index) = build_main_and_index(13, &records);
    let dbf = build_dbf(
        &[DbfField::new("ID", b'N', 4)],
        &[(false, vec![b"1".to_vec()])],
    );

    let mut reader = open((main, index, dbf));
    assert!(reader.advance().expect("advance"));
    let unit = reader.current().expect("current");
    let line = match &unit.shape {
        Shape::PolyLine(l) => l,
        other => panic!("expected a polyline, got {:?}", other),
    };
    assert_eq!(line.z_range, Some((5.0, 7.0)));
    assert_eq!(line.m_range, Some((0.1, 0.3)));
    assert_eq!(line.parts.len(), 1);
    let zs: Vec<Option<f64>> = line.parts[0].iter().map(|p| p.z).collect();
    let ms: Vec<Option<f64>> = line.parts[0].iter().map(|p| p.m).collect();
    assert_eq!(zs, [Some(5.0), Some(6.0), Some(7.0)]);
    assert_eq!(ms, [Some(0.1), Some(0.2), Some(0.3)]);
}

#[test]
fn point_z_without_measure_tail() {
    // A PointZ record whose M value was omitted by the writer.
    let mut payload = point_payload(1.5, 2.5);
    payload.write_f64::<LittleEndian>(9.0).unwrap();
    let record = wrap_record(1, 11, &payload);

    let (_, shape) = shapes::decode_record(0, &record).expect("decode");
    match shape {
        Shape::Point(p) => {
            assert_eq!((p.x, p.y), (1.5, 2.5));
            assert_eq!(p.z, Some(9.0));
            assert_eq!(p.m, None);
        }
        other => panic!("expected a point, got {:?}", other),
    }
}

#[test]
fn unknown_type_code_decodes_to_null_and_enumeration_continues() {
    let records = vec![
        wrap_record(1, 1, &point_payload(1.0, 1.0)),
        wrap_record(2, 99, &[0u8; 16]),
        wrap_record(3, 1, &point_payload(3.0, 3.0)),
    ];
    let (main, index) = build_main_and_index(1, &records);
    let dbf = build_dbf(
        &[DbfField::new("ID", b'N', 4)],
        &[
            (false, vec![b"1".to_vec()]),
            (false, vec![b"2".to_vec()]),
            (false, vec![b"3".to_vec()]),
        ],
    );

    let mut reader = open((main, index, dbf));
    let kinds: Vec<&'static str> = reader
        .units()
        .map(|r| r.expect("unit").shape.kind())
        .collect();
    assert_eq!(kinds, ["Point", "Null", "Point"]);
}

#[test]
fn little_endian_index_is_rejected_by_bounds_check() {
    let records = vec![wrap_record(1, 1, &point_payload(1.0, 1.0))];
    let (main, _) = build_main_and_index(1, &records);

    // Deliberately wrong byte order for the entry words. Read back as
    // big-endian, offset 50 becomes 0x32000000 words, far outside the file.
    let mut index = file_header(1, 54, [0.0, 0.0, 100.0, 100.0]);
    index.write_u32::<LittleEndian>(50).unwrap();
    index.write_u32::<LittleEndian>(10).unwrap();

    let result = ShapefileReader::from_streams(
        Cursor::new(main),
        Cursor::new(index),
        Cursor::new(build_dbf(
            &[DbfField::new("ID", b'N', 4)],
            &[(false, vec![b"1".to_vec()])],
        )),
        None,
    );
    assert!(matches!(result, Err(ShapefileError::InvalidFormat(_))));
}

#[test]
fn short_main_stream_is_a_truncated_header() {
    let (_, index, dbf) = point_triad();
    let result = ShapefileReader::from_streams(
        Cursor::new(vec![0u8; 50]),
        Cursor::new(index),
        Cursor::new(dbf),
        None,
    );
    match result {
        Err(ShapefileError::TruncatedHeader { file, found, .. }) => {
            assert_eq!(file, "main");
            assert_eq!(found, 50);
        }
        other => panic!("expected a truncated header error, got {:?}", other),
    }
}

#[test]
fn deleted_row_stays_aligned_with_its_shape() {
    let records = vec![
        wrap_record(1, 1, &point_payload(1.0, 1.0)),
        wrap_record(2, 1, &point_payload(2.0, 2.0)),
        wrap_record(3, 1, &point_payload(3.0, 3.0)),
    ];
    let (main, index) = build_main_and_index(1, &records);
    let dbf = build_dbf(
        &[DbfField::new("NAME", b'C', 10)],
        &[
            (false, vec![b"first".to_vec()]),
            (true, vec![b"second".to_vec()]),
            (false, vec![b"third".to_vec()]),
        ],
    );

    let mut reader = open((main, index, dbf));
    let units: Vec<_> = reader.units().map(|r| r.expect("unit")).collect();
    assert_eq!(units.len(), 3);

    // Ordinal pairing is physical: the deleted row still rides with shape 1.
    assert!(!units[0].attributes.is_deleted());
    assert!(units[1].attributes.is_deleted());
    assert_eq!(
        units[1].attributes.get("NAME"),
        Some(&AttributeValue::Character("second".to_string()))
    );
    assert_eq!(
        units[2].attributes.get("NAME"),
        Some(&AttributeValue::Character("third".to_string()))
    );
}

#[test]
fn attribute_table_shorter_than_index_fails_on_advance_not_open() {
    let records = vec![
        wrap_record(1, 1, &point_payload(1.0, 1.0)),
        wrap_record(2, 1, &point_payload(2.0, 2.0)),
    ];
    let (main, index) = build_main_and_index(1, &records);
    let dbf = build_dbf(
        &[DbfField::new("ID", b'N', 4)],
        &[(false, vec![b"1".to_vec()])],
    );

    // The count mismatch is a warning at open time, not a truncation.
    let mut reader = open((main, index, dbf));
    assert_eq!(reader.count(), 2);
    assert!(reader.advance().expect("first advance"));
    assert!(matches!(
        reader.advance(),
        Err(ShapefileError::InvalidFormat(_))
    ));
}

#[test]
fn reset_allows_a_second_identical_pass() {
    let mut reader = open(point_triad());

    let first: Vec<_> = reader.units().map(|r| r.expect("unit")).collect();
    reader.reset().expect("reset");
    assert!(matches!(
        reader.current(),
        Err(ShapefileError::CursorNotPositioned)
    ));
    let second: Vec<_> = reader.units().map(|r| r.expect("unit")).collect();
    assert_eq!(first, second);
}

#[test]
fn open_resolves_the_triad_from_any_extension() {
    let (main, index, dbf) = point_triad();
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("cities.shp"), &main).expect("write shp");
    fs::write(dir.path().join("cities.shx"), &index).expect("write shx");
    fs::write(dir.path().join("cities.dbf"), &dbf).expect("write dbf");

    for entry in ["cities.shp", "cities.dbf", "cities.shx"] {
        let reader = ShapefileReader::open(dir.path().join(entry)).expect("open");
        assert_eq!(reader.count(), 3, "opened via {}", entry);
    }

    fs::remove_file(dir.path().join("cities.dbf")).expect("remove dbf");
    assert!(matches!(
        ShapefileReader::open(dir.path().join("cities.shp")),
        Err(ShapefileError::MissingFile(_))
    ));
}
