//! Diagnostic policy shared by every validation pass.
//!
//! A validator never decides on its own whether a failed check aborts the
//! pass, is logged, or is collected for later inspection. It routes every
//! failure through a [`Reporter`], and the caller picks the [`Mode`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required card or column is absent.
    RequiredMissing,
    /// A value's type or dtype is incompatible with the declared constraint,
    /// including casts that would lose information.
    WrongType,
    /// A unit is missing, not convertible, or not strictly equal where an
    /// exact match is required.
    WrongUnit,
    /// The per-row dimensionality does not match the declaration.
    WrongDims,
    /// The fixed per-row shape does not match the declaration.
    WrongShape,
    /// A value is outside the allowed set, or an emptiness constraint is
    /// violated.
    WrongValue,
    /// A card is not at its declared sequence position.
    WrongPosition,
    /// A header card is present that the schema does not declare. Advisory,
    /// never a hard failure.
    UnexpectedCard,
}

impl ErrorKind {
    /// Advisory kinds are reported as warnings and never abort a pass.
    pub fn is_advisory(self) -> bool {
        matches!(self, ErrorKind::UnexpectedCard)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::RequiredMissing => "required missing",
            ErrorKind::WrongType => "wrong type",
            ErrorKind::WrongUnit => "wrong unit",
            ErrorKind::WrongDims => "wrong dimensionality",
            ErrorKind::WrongShape => "wrong shape",
            ErrorKind::WrongValue => "wrong value",
            ErrorKind::WrongPosition => "wrong position",
            ErrorKind::UnexpectedCard => "unexpected card",
        };
        f.write_str(name)
    }
}

/// One structured validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: ErrorKind,
    pub message: String,
}

impl Finding {
    /// True when this finding should fail a validation run.
    pub fn is_hard(&self) -> bool {
        !self.kind.is_advisory()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Error returned when a fail-fast validation pass hits a hard failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Programmer error in a schema declaration. Always raised immediately at
/// schema-definition time, never routed through the diagnostic policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Assignment to a column the schema does not declare.
    #[error("unknown column: {0}")]
    UnknownColumn(String),
}

/// How a validation pass treats failures.
///
/// `Mode` is a closed enum, so an invalid mode cannot be configured at all;
/// the invalid-configuration case of the policy contract is discharged by the
/// type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Abort the pass at the first hard failure.
    FailFast,
    /// Emit every failure as a tracing event and continue. The installed
    /// tracing subscriber acts as the observability sink.
    Log,
    /// Append every failure to a findings list and continue; the caller
    /// inspects the list after the pass.
    #[default]
    Collect,
}

/// Accumulator threading the diagnostic policy through one validation pass.
#[derive(Debug)]
pub struct Reporter {
    mode: Mode,
    findings: Vec<Finding>,
}

impl Reporter {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            findings: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Route one failure through the policy.
    ///
    /// Returns `Err` only in [`Mode::FailFast`] and only for hard kinds;
    /// advisory kinds warn and continue in every mode.
    pub fn report(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let message = message.into();
        match self.mode {
            Mode::FailFast => {
                if kind.is_advisory() {
                    tracing::warn!(%kind, "{message}");
                    Ok(())
                } else {
                    Err(ValidationError { kind, message })
                }
            }
            Mode::Log => {
                if kind.is_advisory() {
                    tracing::warn!(%kind, "{message}");
                } else {
                    tracing::error!(%kind, "{message}");
                }
                Ok(())
            }
            Mode::Collect => {
                self.findings.push(Finding { kind, message });
                Ok(())
            }
        }
    }

    /// Findings accumulated so far (non-empty only in collect mode).
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Consume the reporter, returning the accumulated findings.
    pub fn finish(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_fast_stops_on_hard_kind() {
        let mut reporter = Reporter::new(Mode::FailFast);
        let err = reporter
            .report(ErrorKind::WrongValue, "bad value")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::WrongValue);
        assert_eq!(err.message, "bad value");
    }

    #[test]
    fn test_fail_fast_continues_on_advisory() {
        let mut reporter = Reporter::new(Mode::FailFast);
        assert!(reporter
            .report(ErrorKind::UnexpectedCard, "extra card")
            .is_ok());
        assert!(reporter.findings().is_empty());
    }

    #[test]
    fn test_collect_accumulates() {
        let mut reporter = Reporter::new(Mode::Collect);
        reporter.report(ErrorKind::WrongType, "first").unwrap();
        reporter.report(ErrorKind::WrongShape, "second").unwrap();
        let findings = reporter.finish();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, ErrorKind::WrongType);
        assert_eq!(findings[1].kind, ErrorKind::WrongShape);
    }

    #[test]
    fn test_log_mode_keeps_no_findings() {
        let mut reporter = Reporter::new(Mode::Log);
        reporter.report(ErrorKind::WrongUnit, "logged").unwrap();
        assert!(reporter.finish().is_empty());
    }

    #[test]
    fn test_hard_and_advisory_split() {
        assert!(ErrorKind::UnexpectedCard.is_advisory());
        assert!(!ErrorKind::RequiredMissing.is_advisory());
        assert!(Finding {
            kind: ErrorKind::WrongDims,
            message: String::new()
        }
        .is_hard());
    }
}
