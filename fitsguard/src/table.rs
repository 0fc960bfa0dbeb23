//! Schema declarations for binary table extensions.
//!
//! A [`ColumnSchema`] describes one column: element type, physical unit,
//! per-row dimensionality or shape. A [`TableSchema`] aggregates columns plus
//! a header schema and validates whole extensions; every table schema
//! implicitly extends the standard binary table header. [`TableData`] is a
//! runtime container bound to a schema for building validated tables in
//! memory.

use crate::array::Quantity;
use crate::datatype::DataType;
use crate::diagnostics::{ErrorKind, Finding, Mode, Reporter, SchemaError, ValidationError};
use crate::hdu::TableHdu;
use crate::header::{HeaderSchema, HeaderSchemaBuilder};
use crate::presets;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Schema for one binary table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawColumnSchema", into = "RawColumnSchema")]
pub struct ColumnSchema {
    name: String,
    dtype: DataType,
    unit: Option<Unit>,
    strict_unit: bool,
    required: bool,
    ndim: Option<usize>,
    shape: Option<Vec<usize>>,
}

impl ColumnSchema {
    /// Start declaring a column. The declaration is checked by
    /// [`ColumnSchemaBuilder::build`].
    pub fn new(name: impl Into<String>, dtype: DataType) -> ColumnSchemaBuilder {
        ColumnSchemaBuilder {
            name: name.into(),
            dtype,
            unit: None,
            strict_unit: false,
            required: true,
            ndim: None,
            shape: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn strict_unit(&self) -> bool {
        self.strict_unit
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn shape(&self) -> Option<&[usize]> {
        self.shape.as_deref()
    }

    /// Number of axes of one row's value; scalars per row have rank 0.
    pub fn row_rank(&self) -> usize {
        match (&self.shape, self.ndim) {
            (Some(shape), _) => shape.len(),
            (None, Some(ndim)) => ndim,
            (None, None) => 0,
        }
    }

    /// The TFORM value this column would carry in a file header, repeat
    /// count plus type code (`"3D"`, `"L"`).
    pub fn tform(&self) -> String {
        let repeat: usize = self
            .shape
            .as_ref()
            .map(|s| s.iter().product())
            .unwrap_or(1);
        if repeat == 1 {
            self.dtype.tform_code().to_string()
        } else {
            format!("{repeat}{}", self.dtype.tform_code())
        }
    }

    /// Check one column's data against this declaration.
    ///
    /// On full success returns the normalized value: dtype coerced, unit
    /// converted to the declared one (or the declared unit attached to a bare
    /// array), leading length-1 axes added so the first axis is rows. Returns
    /// `None` when any facet failed in a continuing mode.
    pub fn validate_data(
        &self,
        data: &Quantity,
        reporter: &mut Reporter,
    ) -> Result<Option<Quantity>, ValidationError> {
        let mut ok = true;

        let mut array = match data.array().safe_cast(self.dtype) {
            Ok(cast) => cast,
            Err(err) => {
                reporter.report(
                    ErrorKind::WrongType,
                    format!("column {}: {err}", self.name),
                )?;
                ok = false;
                data.array().clone()
            }
        };

        let mut unit = data.unit().cloned();
        match (&self.unit, data.unit()) {
            (Some(expected), Some(actual)) => {
                if self.strict_unit {
                    if actual != expected {
                        reporter.report(
                            ErrorKind::WrongUnit,
                            format!(
                                "column {}: unit {actual} does not exactly match {expected}",
                                self.name
                            ),
                        )?;
                        ok = false;
                    }
                } else if let Some(factor) = actual.factor_to(expected) {
                    if factor != 1.0 {
                        match array.scaled(factor) {
                            Ok(scaled) => array = scaled,
                            Err(err) => {
                                reporter.report(
                                    ErrorKind::WrongUnit,
                                    format!("column {}: {err}", self.name),
                                )?;
                                ok = false;
                            }
                        }
                    }
                    unit = Some(expected.clone());
                } else {
                    reporter.report(
                        ErrorKind::WrongUnit,
                        format!(
                            "column {}: unit {actual} is not convertible to {expected}",
                            self.name
                        ),
                    )?;
                    ok = false;
                }
            }
            // Bare arrays adopt the declared unit.
            (Some(expected), None) => unit = Some(expected.clone()),
            (None, Some(actual)) => {
                // strict columns without a declared unit take bare numbers only
                if self.strict_unit {
                    reporter.report(
                        ErrorKind::WrongUnit,
                        format!(
                            "column {}: unit {actual} where the schema declares none",
                            self.name
                        ),
                    )?;
                    ok = false;
                }
            }
            (None, None) => {}
        }

        // The first axis is rows; a value of the per-row rank itself counts
        // as one row and gains a leading axis during normalization.
        let expected_rank = self.row_rank() + 1;
        let rank_ok = array.rank() == expected_rank || array.rank() == self.row_rank();
        if !rank_ok {
            reporter.report(
                ErrorKind::WrongDims,
                format!(
                    "column {}: data has {} axes, expected {} (rows plus {} per row)",
                    self.name,
                    array.rank(),
                    expected_rank,
                    self.row_rank()
                ),
            )?;
            ok = false;
        } else {
            array = array.with_min_rank(expected_rank);
            if let Some(shape) = &self.shape {
                if &array.shape()[1..] != shape.as_slice() {
                    reporter.report(
                        ErrorKind::WrongShape,
                        format!(
                            "column {}: rows have shape {:?}, expected {shape:?}",
                            self.name,
                            &array.shape()[1..]
                        ),
                    )?;
                    ok = false;
                }
            }
        }

        if ok {
            Ok(Some(Quantity::new(array, unit)))
        } else {
            Ok(None)
        }
    }
}

/// Builder for [`ColumnSchema`].
#[derive(Debug, Clone)]
pub struct ColumnSchemaBuilder {
    name: String,
    dtype: DataType,
    unit: Option<Unit>,
    strict_unit: bool,
    required: bool,
    ndim: Option<usize>,
    shape: Option<Vec<usize>>,
}

impl ColumnSchemaBuilder {
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Require the incoming unit to equal the declared one exactly instead
    /// of allowing conversion.
    pub fn strict_unit(mut self) -> Self {
        self.strict_unit = true;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    /// Per-row number of axes, without fixing the lengths.
    pub fn ndim(mut self, ndim: usize) -> Self {
        self.ndim = Some(ndim);
        self
    }

    /// Fixed per-row shape. Implies the rank.
    pub fn shape(mut self, shape: impl Into<Vec<usize>>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn build(self) -> Result<ColumnSchema, SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "column name must not be empty".into(),
            ));
        }
        if self.unit.is_some() && !self.dtype.is_numeric() {
            return Err(SchemaError::InvalidSchema(format!(
                "column {}: a unit makes no sense on {} data",
                self.name, self.dtype
            )));
        }
        if let (Some(shape), Some(ndim)) = (&self.shape, self.ndim) {
            if shape.len() != ndim {
                return Err(SchemaError::InvalidSchema(format!(
                    "column {}: shape {shape:?} contradicts ndim {ndim}",
                    self.name
                )));
            }
        }
        if let Some(shape) = &self.shape {
            if shape.iter().any(|&axis| axis == 0) {
                return Err(SchemaError::InvalidSchema(format!(
                    "column {}: shape axes must be positive, got {shape:?}",
                    self.name
                )));
            }
        }
        Ok(ColumnSchema {
            name: self.name,
            dtype: self.dtype,
            unit: self.unit,
            strict_unit: self.strict_unit,
            required: self.required,
            ndim: self.ndim,
            shape: self.shape,
        })
    }
}

/// Schema for a whole binary table extension: header cards plus columns.
///
/// Every table schema implicitly extends the standard binary table header
/// (`XTENSION = 'BINTABLE'` and friends); explicit bases and own cards are
/// merged on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTableSchema", into = "RawTableSchema")]
pub struct TableSchema {
    header: HeaderSchema,
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn builder() -> TableSchemaBuilder {
        TableSchemaBuilder::default()
    }

    pub fn header(&self) -> &HeaderSchema {
        &self.header
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Pure merge, same-name columns from `derived` replacing in place and
    /// new ones appended; the header schemas merge card-wise.
    pub fn merged_with(&self, derived: &TableSchema) -> TableSchema {
        let mut columns = self.columns.clone();
        for column in &derived.columns {
            push_or_replace_column(&mut columns, column.clone());
        }
        TableSchema {
            header: self.header.merged_with(&derived.header),
            columns,
        }
    }

    /// Validate a materialized extension, header and columns in one pass
    /// sharing one reporter.
    ///
    /// File columns the schema does not declare are permitted; declared
    /// optional columns may be absent.
    pub fn validate_with(
        &self,
        hdu: &TableHdu,
        reporter: &mut Reporter,
    ) -> Result<(), ValidationError> {
        self.header.validate_with(&hdu.header, reporter)?;

        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.required && hdu.column(&c.name).is_none())
            .map(|c| c.name.as_str())
            .collect();
        if !missing.is_empty() {
            reporter.report(
                ErrorKind::RequiredMissing,
                format!("required columns missing: {}", missing.join(", ")),
            )?;
        }

        for column in &self.columns {
            if let Some(data) = hdu.column(&column.name) {
                column.validate_data(data, reporter)?;
            }
        }

        Ok(())
    }

    /// Validate a materialized extension.
    pub fn validate_hdu(
        &self,
        hdu: &TableHdu,
        mode: Mode,
    ) -> Result<Vec<Finding>, ValidationError> {
        let mut reporter = Reporter::new(mode);
        self.validate_with(hdu, &mut reporter)?;
        Ok(reporter.finish())
    }
}

fn push_or_replace_column(columns: &mut Vec<ColumnSchema>, column: ColumnSchema) {
    match columns.iter_mut().find(|c| c.name == column.name) {
        Some(slot) => *slot = column,
        None => columns.push(column),
    }
}

/// Composition of a table schema from bases plus own declarations.
///
/// Bases are merged in reverse declaration order so the earliest listed base
/// wins name conflicts between bases; own declarations override everything
/// while keeping the overridden entry's position.
#[derive(Debug, Clone, Default)]
pub struct TableSchemaBuilder {
    bases: Vec<TableSchema>,
    header: HeaderSchemaBuilder,
    columns: Vec<ColumnSchema>,
}

impl TableSchemaBuilder {
    pub fn inherit(mut self, base: &TableSchema) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Declare or override header cards beyond the standard binary table
    /// set.
    pub fn card(mut self, card: crate::header::CardSchema) -> Self {
        self.header = self.header.card(card);
        self
    }

    pub fn column(mut self, column: ColumnSchema) -> Self {
        push_or_replace_column(&mut self.columns, column);
        self
    }

    pub fn columns<I: IntoIterator<Item = ColumnSchema>>(mut self, columns: I) -> Self {
        for column in columns {
            push_or_replace_column(&mut self.columns, column);
        }
        self
    }

    pub fn build(self) -> TableSchema {
        let mut merged = TableSchema {
            header: presets::binary_table_header(),
            columns: Vec::new(),
        };
        for base in self.bases.iter().rev() {
            merged = merged.merged_with(base);
        }
        merged.merged_with(&TableSchema {
            header: self.header.build(),
            columns: self.columns,
        })
    }
}

/// Runtime table bound to a schema.
///
/// Assignments are checked against the declared column set immediately;
/// the data itself is validated by [`validate`](Self::validate), which also
/// normalizes stored values (dtype coercion, unit conversion) for columns
/// that pass.
#[derive(Debug, Clone)]
pub struct TableData {
    schema: Arc<TableSchema>,
    columns: Vec<(String, Quantity)>,
}

impl TableData {
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            schema,
            columns: Vec::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Assign a column value. The name must be declared by the schema.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        data: impl Into<Quantity>,
    ) -> Result<(), SchemaError> {
        let name = name.into();
        if self.schema.column(&name).is_none() {
            return Err(SchemaError::UnknownColumn(name));
        }
        let data = data.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = data,
            None => self.columns.push((name, data)),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, q)| q)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Drop all assigned columns, keeping the schema binding.
    pub fn clear(&mut self) {
        self.columns.clear();
    }

    /// Validate every assigned column, replacing stored values with their
    /// normalized form where validation passes.
    pub fn validate(&mut self, mode: Mode) -> Result<Vec<Finding>, ValidationError> {
        let mut reporter = Reporter::new(mode);

        let missing: Vec<&str> = self
            .schema
            .columns()
            .filter(|c| c.required() && self.get(c.name()).is_none())
            .map(ColumnSchema::name)
            .collect();
        if !missing.is_empty() {
            reporter.report(
                ErrorKind::RequiredMissing,
                format!("required columns missing: {}", missing.join(", ")),
            )?;
        }

        for (name, data) in &mut self.columns {
            // set() guarantees the column is declared
            if let Some(column) = self.schema.column(name) {
                if let Some(clean) = column.validate_data(data, &mut reporter)? {
                    *data = clean;
                }
            }
        }

        Ok(reporter.finish())
    }
}

#[derive(Serialize, Deserialize)]
struct RawColumnSchema {
    name: String,
    dtype: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<Unit>,
    #[serde(default)]
    strict_unit: bool,
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ndim: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape: Option<Vec<usize>>,
}

fn default_true() -> bool {
    true
}

impl TryFrom<RawColumnSchema> for ColumnSchema {
    type Error = SchemaError;

    fn try_from(raw: RawColumnSchema) -> Result<Self, Self::Error> {
        ColumnSchemaBuilder {
            name: raw.name,
            dtype: raw.dtype,
            unit: raw.unit,
            strict_unit: raw.strict_unit,
            required: raw.required,
            ndim: raw.ndim,
            shape: raw.shape,
        }
        .build()
    }
}

impl From<ColumnSchema> for RawColumnSchema {
    fn from(column: ColumnSchema) -> Self {
        RawColumnSchema {
            name: column.name,
            dtype: column.dtype,
            unit: column.unit,
            strict_unit: column.strict_unit,
            required: column.required,
            ndim: column.ndim,
            shape: column.shape,
        }
    }
}

/// Wire shape of [`TableSchema`]: the standard binary table header cards are
/// implicit, `header` only lists additions and overrides.
#[derive(Serialize, Deserialize)]
struct RawTableSchema {
    #[serde(default)]
    header: HeaderSchema,
    columns: Vec<RawColumnSchema>,
}

impl TryFrom<RawTableSchema> for TableSchema {
    type Error = SchemaError;

    fn try_from(raw: RawTableSchema) -> Result<Self, Self::Error> {
        let mut columns = Vec::with_capacity(raw.columns.len());
        for column in raw.columns {
            push_or_replace_column(&mut columns, ColumnSchema::try_from(column)?);
        }
        Ok(TableSchema {
            header: presets::binary_table_header().merged_with(&raw.header),
            columns,
        })
    }
}

impl From<TableSchema> for RawTableSchema {
    fn from(schema: TableSchema) -> Self {
        RawTableSchema {
            header: schema.header,
            columns: schema
                .columns
                .into_iter()
                .map(RawColumnSchema::from)
                .collect(),
        }
    }
}
