//! Schema declarations for FITS headers.
//!
//! A [`CardSchema`] describes one expected keyword record; a
//! [`HeaderSchema`] aggregates them in declaration order, supports
//! inheritance through [`HeaderSchemaBuilder`], and validates an ordered
//! sequence of actual cards. See section 4 of the FITS standard for the
//! header grammar this models.

use crate::diagnostics::{ErrorKind, Finding, Mode, Reporter, SchemaError, ValidationError};
use crate::hdu::{Card, CardValue, Header, ValueType};
use serde::{Deserialize, Serialize};

/// Keyword prefixes that may legally appear many times per table extension
/// (numbered per column) without being declared card by card. They are
/// skipped during additional-card detection, never during position counting.
const RESERVED_PREFIXES: &[&str] = &[
    "TTYPE", "TFORM", "TUNIT", "TSCAL", "TZERO", "TNULL", "TDISP", "TDIM", "TCTYP", "TCUNI",
    "COMMENT", "HISTORY", "CONTINUE",
];

/// Strip the trailing column index from a keyword (`TUNIT12` -> `TUNIT`).
fn strip_index(keyword: &str) -> &str {
    keyword.trim_end_matches(|c: char| c.is_ascii_digit())
}

fn is_reserved(keyword: &str) -> bool {
    keyword.is_empty() || RESERVED_PREFIXES.contains(&strip_index(keyword))
}

fn valid_keyword(keyword: &str) -> bool {
    (1..=8).contains(&keyword.len())
        && keyword
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Schema for one header card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCardSchema", into = "RawCardSchema")]
pub struct CardSchema {
    keyword: String,
    required: bool,
    allowed_values: Option<Vec<CardValue>>,
    position: Option<usize>,
    type_constraint: Option<Vec<ValueType>>,
    empty: Option<bool>,
    case_insensitive: bool,
}

impl CardSchema {
    /// Start declaring a card. The declaration is checked by
    /// [`CardSchemaBuilder::build`].
    pub fn new(keyword: impl Into<String>) -> CardSchemaBuilder {
        CardSchemaBuilder {
            keyword: keyword.into(),
            required: true,
            allowed_values: None,
            position: None,
            type_constraint: None,
            empty: None,
            case_insensitive: true,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn allowed_values(&self) -> Option<&[CardValue]> {
        self.allowed_values.as_deref()
    }

    pub fn type_constraint(&self) -> Option<&[ValueType]> {
        self.type_constraint.as_deref()
    }

    pub fn empty(&self) -> Option<bool> {
        self.empty
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Check one actual card against this declaration.
    ///
    /// `position` is the card's absolute index in the header, counting every
    /// card including reserved ones. The facets (position, emptiness, type,
    /// allowed values) are independent: in log and collect modes all of them
    /// are evaluated even after one fails.
    pub fn validate_card(
        &self,
        card: &Card,
        position: usize,
        reporter: &mut Reporter,
    ) -> Result<(), ValidationError> {
        if let Some(expected) = self.position {
            if expected != position {
                reporter.report(
                    ErrorKind::WrongPosition,
                    format!(
                        "card {} is at position {}, schema requires position {}",
                        self.keyword, position, expected
                    ),
                )?;
            }
        }

        if !card.value.is_defined() {
            if self.empty == Some(false) {
                reporter.report(
                    ErrorKind::WrongValue,
                    format!("card {} must have a value", self.keyword),
                )?;
            }
            return Ok(());
        }

        if self.empty == Some(true) {
            reporter.report(
                ErrorKind::WrongValue,
                format!(
                    "card {} must be empty but has value {}",
                    self.keyword, card.value
                ),
            )?;
        }

        if let (Some(types), Some(found)) = (&self.type_constraint, card.value.value_type()) {
            if !types.contains(&found) {
                let expected: Vec<String> = types.iter().map(ValueType::to_string).collect();
                reporter.report(
                    ErrorKind::WrongType,
                    format!(
                        "card {} has type {}, expected one of: {}",
                        self.keyword,
                        found,
                        expected.join(", ")
                    ),
                )?;
            }
        }

        if let Some(allowed) = &self.allowed_values {
            let hit = allowed
                .iter()
                .any(|candidate| card.value.matches(candidate, self.case_insensitive));
            if !hit {
                let listing: Vec<String> = allowed.iter().map(CardValue::to_string).collect();
                reporter.report(
                    ErrorKind::WrongValue,
                    format!(
                        "card {} has value {}, allowed values are: {}",
                        self.keyword,
                        card.value,
                        listing.join(", ")
                    ),
                )?;
            }
        }

        Ok(())
    }
}

/// Builder for [`CardSchema`]. Declaration errors surface as
/// [`SchemaError::InvalidSchema`] from [`build`](Self::build), immediately at
/// definition time.
#[derive(Debug, Clone)]
pub struct CardSchemaBuilder {
    keyword: String,
    required: bool,
    allowed_values: Option<Vec<CardValue>>,
    position: Option<usize>,
    type_constraint: Option<Vec<ValueType>>,
    empty: Option<bool>,
    case_insensitive: bool,
}

impl CardSchemaBuilder {
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    /// The card must occupy this zero-based position in the header.
    pub fn position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Add one allowed value.
    pub fn allowed(mut self, value: impl Into<CardValue>) -> Self {
        self.allowed_values
            .get_or_insert_with(Vec::new)
            .push(value.into());
        self
    }

    pub fn allowed_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CardValue>,
    {
        self.allowed_values
            .get_or_insert_with(Vec::new)
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Constrain the value to one type family. May be called repeatedly to
    /// allow several families.
    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.type_constraint
            .get_or_insert_with(Vec::new)
            .push(value_type);
        self
    }

    /// `true`: the card must be present without a value. `false`: the card
    /// must carry a value.
    pub fn empty(mut self, empty: bool) -> Self {
        self.empty = Some(empty);
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    pub fn build(self) -> Result<CardSchema, SchemaError> {
        if !valid_keyword(&self.keyword) {
            return Err(SchemaError::InvalidSchema(format!(
                "keyword {:?} must be 1-8 characters from A-Z, 0-9, '-' and '_'",
                self.keyword
            )));
        }

        let mut type_constraint = self.type_constraint;
        if let Some(allowed) = &self.allowed_values {
            match &type_constraint {
                Some(types) => {
                    for value in allowed {
                        let found = value.value_type().ok_or_else(|| {
                            SchemaError::InvalidSchema(format!(
                                "card {}: undefined is not an allowed value",
                                self.keyword
                            ))
                        })?;
                        if !types.contains(&found) {
                            return Err(SchemaError::InvalidSchema(format!(
                                "card {}: allowed value {} does not satisfy the type constraint",
                                self.keyword, value
                            )));
                        }
                    }
                }
                None => {
                    // Derive the constraint from the allowed values.
                    let mut derived = Vec::new();
                    for value in allowed {
                        let found = value.value_type().ok_or_else(|| {
                            SchemaError::InvalidSchema(format!(
                                "card {}: undefined is not an allowed value",
                                self.keyword
                            ))
                        })?;
                        if !derived.contains(&found) {
                            derived.push(found);
                        }
                    }
                    type_constraint = Some(derived);
                }
            }
        }

        Ok(CardSchema {
            keyword: self.keyword,
            required: self.required,
            allowed_values: self.allowed_values,
            position: self.position,
            type_constraint,
            empty: self.empty,
            case_insensitive: self.case_insensitive,
        })
    }
}

/// Ordered mapping from keyword to card schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHeaderSchema", into = "RawHeaderSchema")]
pub struct HeaderSchema {
    cards: Vec<CardSchema>,
}

impl HeaderSchema {
    pub fn builder() -> HeaderSchemaBuilder {
        HeaderSchemaBuilder::default()
    }

    pub fn get(&self, keyword: &str) -> Option<&CardSchema> {
        self.cards.iter().find(|c| c.keyword == keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardSchema> {
        self.cards.iter()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.keyword.as_str())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Pure merge: base cards in base order with same-keyword cards from
    /// `derived` replacing in place, then derived-only cards appended in
    /// their declaration order.
    pub fn merged_with(&self, derived: &HeaderSchema) -> HeaderSchema {
        let mut cards = self.cards.clone();
        for card in &derived.cards {
            push_or_replace(&mut cards, card.clone());
        }
        HeaderSchema { cards }
    }

    /// Validate an actual header, accumulating per the reporter's mode.
    pub fn validate_with(
        &self,
        header: &Header,
        reporter: &mut Reporter,
    ) -> Result<(), ValidationError> {
        let missing: Vec<&str> = self
            .cards
            .iter()
            .filter(|c| c.required && !header.contains(&c.keyword))
            .map(|c| c.keyword.as_str())
            .collect();
        if !missing.is_empty() {
            reporter.report(
                ErrorKind::RequiredMissing,
                format!("required header cards missing: {}", missing.join(", ")),
            )?;
        }

        // Position is absolute file order, counting every card.
        for (position, card) in header.iter().enumerate() {
            match self.get(&card.keyword) {
                Some(schema) => schema.validate_card(card, position, reporter)?,
                None => {
                    if !is_reserved(&card.keyword) {
                        reporter.report(
                            ErrorKind::UnexpectedCard,
                            format!("header card {} is not defined by the schema", card.keyword),
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Validate an actual header.
    ///
    /// In fail-fast mode the first hard failure is returned as `Err`; in
    /// collect mode all findings are returned; in log mode findings are
    /// emitted as tracing events and the list is empty.
    pub fn validate(
        &self,
        header: &Header,
        mode: Mode,
    ) -> Result<Vec<Finding>, ValidationError> {
        let mut reporter = Reporter::new(mode);
        self.validate_with(header, &mut reporter)?;
        Ok(reporter.finish())
    }
}

pub(crate) fn push_or_replace(cards: &mut Vec<CardSchema>, card: CardSchema) {
    match cards.iter_mut().find(|c| c.keyword == card.keyword) {
        Some(slot) => *slot = card,
        None => cards.push(card),
    }
}

/// Composition of a header schema from base schemas plus own declarations.
///
/// Bases are merged in reverse declaration order so the earliest listed base
/// wins keyword conflicts between bases; own cards override everything while
/// keeping the overridden card's position. Duplicate own declarations are
/// last-definition-wins.
#[derive(Debug, Clone, Default)]
pub struct HeaderSchemaBuilder {
    bases: Vec<HeaderSchema>,
    cards: Vec<CardSchema>,
}

impl HeaderSchemaBuilder {
    pub fn inherit(mut self, base: &HeaderSchema) -> Self {
        self.bases.push(base.clone());
        self
    }

    pub fn card(mut self, card: CardSchema) -> Self {
        push_or_replace(&mut self.cards, card);
        self
    }

    pub fn cards<I: IntoIterator<Item = CardSchema>>(mut self, cards: I) -> Self {
        for card in cards {
            push_or_replace(&mut self.cards, card);
        }
        self
    }

    pub fn build(self) -> HeaderSchema {
        let mut merged = HeaderSchema::default();
        for base in self.bases.iter().rev() {
            merged = merged.merged_with(base);
        }
        merged.merged_with(&HeaderSchema { cards: self.cards })
    }
}

#[derive(Serialize, Deserialize)]
struct RawCardSchema {
    keyword: String,
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowed_values: Option<Vec<CardValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_type: Option<Vec<ValueType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    empty: Option<bool>,
    #[serde(default = "default_true")]
    case_insensitive: bool,
}

fn default_true() -> bool {
    true
}

impl TryFrom<RawCardSchema> for CardSchema {
    type Error = SchemaError;

    fn try_from(raw: RawCardSchema) -> Result<Self, Self::Error> {
        let builder = CardSchemaBuilder {
            keyword: raw.keyword,
            required: raw.required,
            allowed_values: raw.allowed_values,
            position: raw.position,
            type_constraint: raw.value_type,
            empty: raw.empty,
            case_insensitive: raw.case_insensitive,
        };
        builder.build()
    }
}

impl From<CardSchema> for RawCardSchema {
    fn from(card: CardSchema) -> Self {
        RawCardSchema {
            keyword: card.keyword,
            required: card.required,
            allowed_values: card.allowed_values,
            position: card.position,
            value_type: card.type_constraint,
            empty: card.empty,
            case_insensitive: card.case_insensitive,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct RawHeaderSchema {
    cards: Vec<RawCardSchema>,
}

impl TryFrom<RawHeaderSchema> for HeaderSchema {
    type Error = SchemaError;

    fn try_from(raw: RawHeaderSchema) -> Result<Self, Self::Error> {
        let mut cards = Vec::with_capacity(raw.cards.len());
        for card in raw.cards {
            push_or_replace(&mut cards, CardSchema::try_from(card)?);
        }
        Ok(HeaderSchema { cards })
    }
}

impl From<HeaderSchema> for RawHeaderSchema {
    fn from(schema: HeaderSchema) -> Self {
        RawHeaderSchema {
            cards: schema.cards.into_iter().map(RawCardSchema::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_rules() {
        assert!(CardSchema::new("DATE-OBS").build().is_ok());
        assert!(CardSchema::new("T_FIELD2").build().is_ok());
        assert!(CardSchema::new("MORETHAN8").build().is_err());
        assert!(CardSchema::new("lowercas").build().is_err());
        assert!(CardSchema::new("").build().is_err());
        assert!(CardSchema::new("BAD KEY").build().is_err());
    }

    #[test]
    fn test_type_derived_from_allowed_values() {
        let card = CardSchema::new("XTENSION")
            .allowed("BINTABLE")
            .build()
            .unwrap();
        assert_eq!(card.type_constraint(), Some(&[ValueType::Text][..]));
    }

    #[test]
    fn test_allowed_values_must_satisfy_type() {
        let err = CardSchema::new("BITPIX")
            .value_type(ValueType::Int)
            .allowed("eight")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)));
    }

    #[test]
    fn test_undefined_not_allowed_as_value() {
        let err = CardSchema::new("TEST")
            .allowed(CardValue::Undefined)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)));
    }

    #[test]
    fn test_merge_overrides_in_place() {
        let base = HeaderSchema::builder()
            .card(CardSchema::new("FOO").build().unwrap())
            .card(CardSchema::new("BAR").value_type(ValueType::Text).build().unwrap())
            .build();
        let derived = HeaderSchema::builder()
            .inherit(&base)
            .card(CardSchema::new("BAR").value_type(ValueType::Int).build().unwrap())
            .build();

        let keywords: Vec<&str> = derived.keywords().collect();
        assert_eq!(keywords, ["FOO", "BAR"]);
        assert_eq!(
            derived.get("BAR").unwrap().type_constraint(),
            Some(&[ValueType::Int][..])
        );
        // merge is pure: the base is untouched
        assert_eq!(
            base.get("BAR").unwrap().type_constraint(),
            Some(&[ValueType::Text][..])
        );
    }

    #[test]
    fn test_multi_base_merge_earlier_base_wins() {
        let first = HeaderSchema::builder()
            .card(CardSchema::new("A").allowed(1).build().unwrap())
            .build();
        let second = HeaderSchema::builder()
            .card(CardSchema::new("A").allowed(2).build().unwrap())
            .card(CardSchema::new("B").build().unwrap())
            .build();
        let merged = HeaderSchema::builder()
            .inherit(&first)
            .inherit(&second)
            .build();
        assert_eq!(
            merged.get("A").unwrap().allowed_values(),
            Some(&[CardValue::Int(1)][..])
        );
        assert!(merged.get("B").is_some());
    }

    #[test]
    fn test_last_own_declaration_wins() {
        let schema = HeaderSchema::builder()
            .card(CardSchema::new("A").allowed(1).build().unwrap())
            .card(CardSchema::new("A").allowed(2).build().unwrap())
            .build();
        assert_eq!(schema.len(), 1);
        assert_eq!(
            schema.get("A").unwrap().allowed_values(),
            Some(&[CardValue::Int(2)][..])
        );
    }

    #[test]
    fn test_reserved_prefixes() {
        assert!(is_reserved("TUNIT12"));
        assert!(is_reserved("TTYPE1"));
        assert!(is_reserved("COMMENT"));
        assert!(is_reserved(""));
        assert!(!is_reserved("TELESCOP"));
        assert!(!is_reserved("NAXIS1"));
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = HeaderSchema::builder()
            .card(
                CardSchema::new("SIMPLE")
                    .allowed(true)
                    .position(0)
                    .build()
                    .unwrap(),
            )
            .card(CardSchema::new("OBSERVER").optional().value_type(ValueType::Text).build().unwrap())
            .build();
        let json = serde_json::to_string(&schema).unwrap();
        let back: HeaderSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);

        let invalid = r#"[{"keyword":"toolongkeyword"}]"#;
        assert!(serde_json::from_str::<HeaderSchema>(invalid).is_err());
    }
}
