//! In-memory views of file structures awaiting validation.
//!
//! The engine never touches bytes. An external reader materializes a header
//! as an ordered sequence of [`Card`]s and a binary table extension as a
//! [`TableHdu`] holding that header plus named column data; validation works
//! on these read-only views.

use crate::array::Quantity;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type family of a header card value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Logical,
    Int,
    Float,
    Complex,
    Text,
    Date,
    DateTime,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Logical => "logical",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Complex => "complex",
            ValueType::Text => "text",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// The value slot of one header card.
///
/// `Undefined` models a card that is present but carries no value.
///
/// The JSON representation is untagged (`true`, `5`, `5.5`, `[1.0, 2.0]`,
/// `"text"`, `null`); date and datetime values therefore serialize as their
/// ISO strings and deserialize as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardValue {
    Logical(bool),
    Int(i64),
    Float(f64),
    Complex((f64, f64)),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Undefined,
}

impl CardValue {
    /// The value's type family; `None` for `Undefined`.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            CardValue::Logical(_) => ValueType::Logical,
            CardValue::Int(_) => ValueType::Int,
            CardValue::Float(_) => ValueType::Float,
            CardValue::Complex(_) => ValueType::Complex,
            CardValue::Text(_) => ValueType::Text,
            CardValue::Date(_) => ValueType::Date,
            CardValue::DateTime(_) => ValueType::DateTime,
            CardValue::Undefined => return None,
        })
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, CardValue::Undefined)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            CardValue::Int(v) => Some(*v as f64),
            CardValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Compare against an allowed value. Numbers compare across the
    /// int/float divide; text comparison upper-cases both sides when
    /// `case_insensitive` is set.
    pub fn matches(&self, allowed: &CardValue, case_insensitive: bool) -> bool {
        match (self, allowed) {
            (CardValue::Text(a), CardValue::Text(b)) => {
                if case_insensitive {
                    a.eq_ignore_ascii_case(b)
                } else {
                    a == b
                }
            }
            _ => {
                if let (Some(a), Some(b)) = (self.as_f64(), allowed.as_f64()) {
                    a == b
                } else {
                    self == allowed
                }
            }
        }
    }
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardValue::Logical(true) => f.write_str("T"),
            CardValue::Logical(false) => f.write_str("F"),
            CardValue::Int(v) => write!(f, "{v}"),
            CardValue::Float(v) => write!(f, "{v}"),
            CardValue::Complex((re, im)) => write!(f, "({re}, {im})"),
            CardValue::Text(v) => write!(f, "'{v}'"),
            CardValue::Date(v) => write!(f, "{v}"),
            CardValue::DateTime(v) => write!(f, "{v}"),
            CardValue::Undefined => f.write_str("<undefined>"),
        }
    }
}

impl From<bool> for CardValue {
    fn from(v: bool) -> Self {
        CardValue::Logical(v)
    }
}

impl From<i64> for CardValue {
    fn from(v: i64) -> Self {
        CardValue::Int(v)
    }
}

impl From<i32> for CardValue {
    fn from(v: i32) -> Self {
        CardValue::Int(v.into())
    }
}

impl From<f64> for CardValue {
    fn from(v: f64) -> Self {
        CardValue::Float(v)
    }
}

impl From<&str> for CardValue {
    fn from(v: &str) -> Self {
        CardValue::Text(v.to_string())
    }
}

impl From<String> for CardValue {
    fn from(v: String) -> Self {
        CardValue::Text(v)
    }
}

impl From<NaiveDate> for CardValue {
    fn from(v: NaiveDate) -> Self {
        CardValue::Date(v)
    }
}

impl From<NaiveDateTime> for CardValue {
    fn from(v: NaiveDateTime) -> Self {
        CardValue::DateTime(v)
    }
}

impl From<(f64, f64)> for CardValue {
    fn from(v: (f64, f64)) -> Self {
        CardValue::Complex(v)
    }
}

/// One keyword record of a header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub keyword: String,
    #[serde(default = "undefined")]
    pub value: CardValue,
}

fn undefined() -> CardValue {
    CardValue::Undefined
}

impl Card {
    pub fn new(keyword: impl Into<String>, value: impl Into<CardValue>) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
        }
    }

    /// A card that is present but carries no value.
    pub fn undefined(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: CardValue::Undefined,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_defined()
    }
}

/// An ordered sequence of header cards, as materialized from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a card regardless of whether the keyword already exists.
    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Replace the first card with this keyword in place, or append.
    pub fn set(&mut self, keyword: impl Into<String>, value: impl Into<CardValue>) {
        let keyword = keyword.into();
        let value = value.into();
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => card.value = value,
            None => self.cards.push(Card { keyword, value }),
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&CardValue> {
        self.card(keyword).map(|c| &c.value)
    }

    pub fn card(&self, keyword: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword == keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.card(keyword).is_some()
    }

    pub fn remove(&mut self, keyword: &str) -> Option<Card> {
        let index = self.cards.iter().position(|c| c.keyword == keyword)?;
        Some(self.cards.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl From<Vec<Card>> for Header {
    fn from(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

impl FromIterator<Card> for Header {
    fn from_iter<T: IntoIterator<Item = Card>>(iter: T) -> Self {
        Self {
            cards: iter.into_iter().collect(),
        }
    }
}

/// One materialized column of a binary table extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileColumn {
    pub name: String,
    pub data: Quantity,
}

/// A materialized binary table extension: header plus named column data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableHdu {
    #[serde(default)]
    pub header: Header,
    #[serde(default)]
    pub columns: Vec<FileColumn>,
}

impl TableHdu {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            columns: Vec::new(),
        }
    }

    pub fn insert_column(&mut self, name: impl Into<String>, data: impl Into<Quantity>) {
        self.columns.push(FileColumn {
            name: name.into(),
            data: data.into(),
        });
    }

    pub fn column(&self, name: &str) -> Option<&Quantity> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.data)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
