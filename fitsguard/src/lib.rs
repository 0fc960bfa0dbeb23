//! FitsGuard - declarative schema validation for FITS headers and tables
//!
//! This library lets you describe the expected structure of a FITS header
//! or binary table extension once, as a schema, and validate in-memory
//! files against it: required cards, value types and allowed values, card
//! positions, column dtypes, physical units, and per-row shapes.
//!
//! # Quick Start
//!
//! ```
//! use fitsguard::{ColumnSchema, DataType, Mode, TableSchema, Unit};
//!
//! let schema = TableSchema::builder()
//!     .column(
//!         ColumnSchema::new("energy", DataType::Float64)
//!             .unit("TeV".parse::<Unit>().unwrap())
//!             .build()
//!             .unwrap(),
//!     )
//!     .build();
//!
//! let mut table = fitsguard::TableData::new(schema.into());
//! table.set("energy", vec![1.2, 3.4]).unwrap();
//! for finding in table.validate(Mode::Collect).unwrap() {
//!     println!("{finding}");
//! }
//! ```
//!
//! # Features
//!
//! - **Header schemas**: per-card type, value, position and emptiness rules
//! - **Table schemas**: column dtype, unit and shape rules over a header base
//! - **Composition**: schemas inherit and merge, overriding card by card
//! - **Diagnostic policy**: fail fast, log, or collect every finding

pub mod array;
pub mod datatype;
pub mod diagnostics;
pub mod hdu;
pub mod header;
pub mod presets;
pub mod table;
pub mod units;

// Re-export main types
pub use array::{ArrayBuffer, ArrayError, CastError, ColumnArray, Quantity};
pub use datatype::DataType;
pub use diagnostics::{ErrorKind, Finding, Mode, Reporter, SchemaError, ValidationError};
pub use hdu::{Card, CardValue, FileColumn, Header, TableHdu, ValueType};
pub use header::{CardSchema, CardSchemaBuilder, HeaderSchema, HeaderSchemaBuilder};
pub use table::{ColumnSchema, ColumnSchemaBuilder, TableData, TableSchema, TableSchemaBuilder};
pub use units::{Unit, UnitError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Card, CardSchema, CardValue, ColumnSchema, DataType, ErrorKind, Finding, Header,
        HeaderSchema, Mode, Quantity, SchemaError, TableData, TableHdu, TableSchema, Unit,
        ValidationError, ValueType,
    };
}
