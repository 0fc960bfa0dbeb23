//! Ready-made schemas for the structural headers every conforming file
//! carries (FITS standard, sections 4.4.1 and 7.3.1).

use crate::hdu::ValueType;
use crate::header::{CardSchema, CardSchemaBuilder, HeaderSchema};

fn card(builder: CardSchemaBuilder) -> CardSchema {
    builder.build().expect("preset card schemas are valid")
}

/// Mandatory cards of a primary header.
pub fn primary_header() -> HeaderSchema {
    HeaderSchema::builder()
        .card(card(CardSchema::new("SIMPLE").position(0).allowed(true)))
        .card(card(
            CardSchema::new("BITPIX")
                .position(1)
                .allowed_values([8, 16, 32, 64, -32, -64]),
        ))
        .card(card(
            CardSchema::new("NAXIS").position(2).allowed_values(0..999),
        ))
        .card(card(
            CardSchema::new("EXTEND").optional().value_type(ValueType::Logical),
        ))
        .card(card(
            CardSchema::new("OBJECT").optional().value_type(ValueType::Text),
        ))
        .card(card(
            CardSchema::new("TELESCOP").optional().value_type(ValueType::Text),
        ))
        .card(card(
            CardSchema::new("INSTRUME").optional().value_type(ValueType::Text),
        ))
        .card(card(
            CardSchema::new("OBSERVER").optional().value_type(ValueType::Text),
        ))
        .card(card(
            CardSchema::new("DATE-OBS")
                .optional()
                .value_type(ValueType::Date)
                .value_type(ValueType::DateTime)
                .value_type(ValueType::Text),
        ))
        .build()
}

/// Mandatory cards of a binary table extension header. Implicitly the base
/// of every [`TableSchema`](crate::table::TableSchema) header.
pub fn binary_table_header() -> HeaderSchema {
    HeaderSchema::builder()
        .card(card(
            CardSchema::new("XTENSION").position(0).allowed("BINTABLE"),
        ))
        .card(card(CardSchema::new("BITPIX").position(1).allowed(8)))
        .card(card(CardSchema::new("NAXIS").position(2).allowed(2)))
        .card(card(
            CardSchema::new("NAXIS1").position(3).value_type(ValueType::Int),
        ))
        .card(card(
            CardSchema::new("NAXIS2").position(4).value_type(ValueType::Int),
        ))
        .card(card(
            CardSchema::new("PCOUNT").position(5).value_type(ValueType::Int),
        ))
        .card(card(CardSchema::new("GCOUNT").position(6).allowed(1)))
        .card(card(
            CardSchema::new("TFIELDS").position(7).value_type(ValueType::Int),
        ))
        .card(card(
            CardSchema::new("EXTNAME").optional().value_type(ValueType::Text),
        ))
        .build()
}
