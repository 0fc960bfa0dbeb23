//! Declare an event-list schema, build a table against it, and validate a
//! deliberately broken HDU in collect mode.
//!
//! Run with: cargo run --example validate_events

use fitsguard::prelude::*;

fn main() {
    let schema = TableSchema::builder()
        .card(
            CardSchema::new("OBS_ID")
                .value_type(ValueType::Int)
                .build()
                .unwrap(),
        )
        .column(ColumnSchema::new("EVENT_ID", DataType::Int64).build().unwrap())
        .column(
            ColumnSchema::new("ENERGY", DataType::Float64)
                .unit("TeV".parse().unwrap())
                .build()
                .unwrap(),
        )
        .build();

    // Building a table in memory: assignments are name-checked, validation
    // converts the GeV data to the declared TeV.
    let mut table = TableData::new(schema.clone().into());
    table.set("EVENT_ID", vec![1i64, 2, 3]).unwrap();
    table
        .set(
            "ENERGY",
            Quantity::from(vec![500.0, 1500.0, 2500.0]).with_unit("GeV".parse().unwrap()),
        )
        .unwrap();
    let findings = table.validate(Mode::Collect).unwrap();
    println!("in-memory table: {} finding(s)", findings.len());
    println!(
        "stored energies: {:?} {}",
        table.get("ENERGY").unwrap().array().buffer(),
        table.get("ENERGY").unwrap().unit().unwrap()
    );

    // Validating a file-shaped HDU with several problems at once.
    let mut header = Header::new();
    header.set("XTENSION", "BINTABLE");
    header.set("BITPIX", 16); // must be 8
    header.set("NAXIS", 2);
    header.set("NAXIS1", 16);
    header.set("NAXIS2", 3);
    header.set("PCOUNT", 0);
    header.set("GCOUNT", 1);
    header.set("TFIELDS", 2);
    header.set("OBS_ID", "forty-two"); // must be an int
    header.set("SURPRISE", 1); // not declared

    let mut hdu = TableHdu::new(header);
    hdu.insert_column(
        "ENERGY",
        Quantity::from(vec![1.0, 2.0, 3.0]).with_unit("deg".parse().unwrap()),
    );

    println!("\nbroken HDU:");
    for finding in schema.validate_hdu(&hdu, Mode::Collect).unwrap() {
        println!("  {finding}");
    }
}
