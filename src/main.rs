use shapefile_reader::{Shape, ShapefileReader};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <path-to-shapefile> [--verbose]", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let verbose = args.iter().any(|arg| arg == "--verbose");

    println!("Reading shapefile: {}", path);
    println!("{}", "=".repeat(60));

    let mut reader = match ShapefileReader::open(path) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("\nERROR: Failed to open shapefile triad");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let bounds = reader.bounding_box();
    println!("\nShapefile Information:");
    println!("  Type: {:?}", reader.shape_type());
    println!("  Shapes: {}", reader.count());
    println!(
        "  Bounds: {},{} -> {},{}",
        bounds.x_min, bounds.y_min, bounds.x_max, bounds.y_max
    );

    let field_names: Vec<String> = reader.field_names().map(String::from).collect();
    println!("  Fields: {}", field_names.join(", "));
    println!();

    let mut failures = 0usize;
    for result in reader.units() {
        let unit = match result {
            Ok(unit) => unit,
            Err(e) => {
                eprintln!("ERROR reading record: {}", e);
                failures += 1;
                if failures > 10 {
                    eprintln!("Too many failures, giving up.");
                    std::process::exit(1);
                }
                continue;
            }
        };

        let deleted = if unit.attributes.is_deleted() {
            " [deleted]"
        } else {
            ""
        };
        println!(
            "Shape {} (record {}): {}, {} points{}",
            unit.ordinal,
            unit.record_number,
            unit.shape.kind(),
            unit.shape.point_count(),
            deleted
        );

        if verbose {
            for (name, value) in unit.attributes.iter() {
                println!("  {} = {}", name, value);
            }
            match &unit.shape {
                Shape::Point(p) => println!("  point: {}, {}", p.x, p.y),
                Shape::MultiPoint(m) => {
                    for p in &m.points {
                        println!("  point: {}, {}", p.x, p.y);
                    }
                }
                Shape::PolyLine(l) => {
                    for (i, part) in l.parts.iter().enumerate() {
                        println!("  part {}: {} points", i, part.len());
                    }
                }
                Shape::Polygon(p) => {
                    // Rings are clockwise for boundaries, counter-clockwise
                    // for holes, exactly as stored.
                    for (i, part) in p.parts.iter().enumerate() {
                        println!("  ring {}: {} points", i, part.len());
                    }
                }
                Shape::Null => {}
            }
            println!();
        }
    }

    println!("\nDone.");
}
