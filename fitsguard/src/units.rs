//! Physical units for column data.
//!
//! The validation engine only ever needs three operations from a unit
//! system: parse a unit expression, test whether two units are convertible,
//! and compute the conversion factor between convertible units. This module
//! provides them over a small dimensional-analysis model covering the units
//! that commonly appear in FITS table extensions (`TUNIT` strings such as
//! `"TeV"`, `"deg"`, `"km/s"`, `"m s-2"`).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Exponents over the base dimensions:
/// length, mass, time, current, temperature, amount, luminosity, angle.
type Dims = [i8; 8];

const DIMENSIONLESS: Dims = [0; 8];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("unknown unit symbol: {0}")]
    UnknownSymbol(String),
    #[error("invalid exponent in unit token: {0}")]
    InvalidExponent(String),
}

/// A parsed physical unit: a scale factor relative to SI base units plus a
/// dimension vector.
///
/// Equality compares physics, not spelling: `"m"` equals `"100 cm"` but not
/// `"mm"`. The original spelling is kept for display.
#[derive(Debug, Clone)]
pub struct Unit {
    factor: f64,
    dims: Dims,
    repr: String,
}

impl Unit {
    /// The unit of bare numbers.
    pub fn dimensionless() -> Self {
        Self {
            factor: 1.0,
            dims: DIMENSIONLESS,
            repr: String::new(),
        }
    }

    /// Parse a FITS-style unit expression.
    ///
    /// Terms are separated by whitespace or `*`; a `/` inverts the segment
    /// that follows it; an integer exponent may trail a symbol directly or
    /// after `^` (`"m2"`, `"m^2"`, `"m-2"`). SI prefixes are understood.
    pub fn parse(text: &str) -> Result<Self, UnitError> {
        let mut factor = 1.0f64;
        let mut dims = DIMENSIONLESS;

        for (segment_index, segment) in text.split('/').enumerate() {
            let sign: i32 = if segment_index == 0 { 1 } else { -1 };
            for token in segment.split(|c: char| c.is_whitespace() || c == '*') {
                if token.is_empty() {
                    continue;
                }
                // A bare numeric factor, as in "100 cm".
                if let Ok(value) = token.parse::<f64>() {
                    factor *= value.powi(sign);
                    continue;
                }
                let (sym_factor, sym_dims, exponent) = parse_token(token)?;
                let exponent = exponent * sign;
                factor *= sym_factor.powi(exponent);
                for (d, s) in dims.iter_mut().zip(sym_dims.iter()) {
                    *d += (*s as i32 * exponent) as i8;
                }
            }
        }

        Ok(Self {
            factor,
            dims,
            repr: text.trim().to_string(),
        })
    }

    /// Whether values in `self` can be converted to `other`.
    pub fn convertible(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// Multiplicative factor converting a value in `self` to `other`, if the
    /// units are dimensionally compatible.
    pub fn factor_to(&self, other: &Unit) -> Option<f64> {
        if self.convertible(other) {
            Some(self.factor / other.factor)
        } else {
            None
        }
    }

    /// Convert a scalar value from `self` to `other`.
    pub fn convert(&self, value: f64, other: &Unit) -> Option<f64> {
        self.factor_to(other).map(|f| value * f)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        if self.dims != other.dims {
            return false;
        }
        let scale = self.factor.abs().max(other.factor.abs());
        (self.factor - other.factor).abs() <= scale * 1e-9
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.repr)
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Unit::parse(&text).map_err(D::Error::custom)
    }
}

/// Split one token into symbol factor, symbol dimensions and exponent.
fn parse_token(token: &str) -> Result<(f64, Dims, i32), UnitError> {
    let symbol_len = token
        .char_indices()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    let (symbol, mut rest) = token.split_at(symbol_len);

    if symbol.is_empty() {
        return Err(UnitError::UnknownSymbol(token.to_string()));
    }

    rest = rest.strip_prefix('^').unwrap_or(rest);
    let exponent = if rest.is_empty() {
        1
    } else {
        rest.parse::<i32>()
            .map_err(|_| UnitError::InvalidExponent(token.to_string()))?
    };

    let (factor, dims) = resolve_symbol(symbol)
        .ok_or_else(|| UnitError::UnknownSymbol(symbol.to_string()))?;
    Ok((factor, dims, exponent))
}

/// Resolve a symbol, trying a bare match first and an SI-prefixed match
/// second, so `"TeV"` is tera-electronvolt even though `"T"` is tesla.
fn resolve_symbol(symbol: &str) -> Option<(f64, Dims)> {
    if let Some(hit) = base_symbol(symbol) {
        return Some(hit);
    }
    for (prefix, scale) in PREFIXES {
        if let Some(stripped) = symbol.strip_prefix(prefix) {
            if let Some((factor, dims)) = base_symbol(stripped) {
                return Some((factor * scale, dims));
            }
        }
    }
    None
}

// "da" must be tried before the single-character prefixes.
const PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1),
    ("h", 1e2),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("\u{b5}", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
];

fn base_symbol(symbol: &str) -> Option<(f64, Dims)> {
    // dims: [length, mass, time, current, temperature, amount, luminosity, angle]
    Some(match symbol {
        "m" => (1.0, [1, 0, 0, 0, 0, 0, 0, 0]),
        "g" => (1e-3, [0, 1, 0, 0, 0, 0, 0, 0]),
        "s" => (1.0, [0, 0, 1, 0, 0, 0, 0, 0]),
        "A" => (1.0, [0, 0, 0, 1, 0, 0, 0, 0]),
        "K" => (1.0, [0, 0, 0, 0, 1, 0, 0, 0]),
        "mol" => (1.0, [0, 0, 0, 0, 0, 1, 0, 0]),
        "cd" => (1.0, [0, 0, 0, 0, 0, 0, 1, 0]),
        "rad" => (1.0, [0, 0, 0, 0, 0, 0, 0, 1]),
        "deg" => (std::f64::consts::PI / 180.0, [0, 0, 0, 0, 0, 0, 0, 1]),
        "arcmin" => (std::f64::consts::PI / 10_800.0, [0, 0, 0, 0, 0, 0, 0, 1]),
        "arcsec" => (std::f64::consts::PI / 648_000.0, [0, 0, 0, 0, 0, 0, 0, 1]),
        "sr" => (1.0, [0, 0, 0, 0, 0, 0, 0, 2]),
        "Hz" => (1.0, [0, 0, -1, 0, 0, 0, 0, 0]),
        "N" => (1.0, [1, 1, -2, 0, 0, 0, 0, 0]),
        "Pa" => (1.0, [-1, 1, -2, 0, 0, 0, 0, 0]),
        "J" => (1.0, [2, 1, -2, 0, 0, 0, 0, 0]),
        "W" => (1.0, [2, 1, -3, 0, 0, 0, 0, 0]),
        "eV" => (1.602_176_634e-19, [2, 1, -2, 0, 0, 0, 0, 0]),
        "V" => (1.0, [2, 1, -3, -1, 0, 0, 0, 0]),
        "C" => (1.0, [0, 0, 1, 1, 0, 0, 0, 0]),
        "T" => (1.0, [0, 1, -2, -1, 0, 0, 0, 0]),
        "barn" => (1e-28, [2, 0, 0, 0, 0, 0, 0, 0]),
        "Jy" => (1e-26, [0, 1, -2, 0, 0, 0, 0, 0]),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(text: &str) -> Unit {
        Unit::parse(text).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        assert_eq!(unit("m").factor_to(&unit("m")), Some(1.0));
        assert_eq!(unit("km").factor_to(&unit("m")), Some(1000.0));
        assert!((unit("TeV").factor_to(&unit("eV")).unwrap() - 1e12).abs() < 1.0);
    }

    #[test]
    fn test_prefix_vs_symbol_ambiguity() {
        // "T" alone is tesla; "TeV" is tera-electronvolt.
        assert!(!unit("T").convertible(&unit("eV")));
        assert!(unit("TeV").convertible(&unit("eV")));
    }

    #[test]
    fn test_compound_expressions() {
        let kms = unit("km/s");
        let ms = unit("m s-1");
        assert!(kms.convertible(&ms));
        assert_eq!(kms.factor_to(&ms), Some(1000.0));

        let accel = unit("m/s2");
        assert!(accel.convertible(&unit("m s^-2")));
        assert!(!accel.convertible(&ms));
    }

    #[test]
    fn test_angle_units() {
        let deg = unit("deg");
        let rad = unit("rad");
        assert!(deg.convertible(&rad));
        let factor = deg.factor_to(&rad).unwrap();
        assert!((factor - std::f64::consts::PI / 180.0).abs() < 1e-12);
        assert!((unit("arcsec").factor_to(&deg).unwrap() - 1.0 / 3600.0).abs() < 1e-15);
    }

    #[test]
    fn test_incompatible_dimensions() {
        assert!(!unit("m").convertible(&unit("deg")));
        assert_eq!(unit("m").factor_to(&unit("s")), None);
    }

    #[test]
    fn test_equality_is_physical() {
        assert_eq!(unit("m"), unit("100 cm"));
        assert_ne!(unit("mm"), unit("m"));
        assert_ne!(unit("m"), unit("deg"));
    }

    #[test]
    fn test_kilogram_prefix() {
        assert_eq!(unit("kg").factor_to(&unit("g")), Some(1000.0));
    }

    #[test]
    fn test_unknown_symbol() {
        assert!(matches!(
            Unit::parse("furlong"),
            Err(UnitError::UnknownSymbol(_))
        ));
        assert!(matches!(
            Unit::parse("m1.5"),
            Err(UnitError::InvalidExponent(_))
        ));
    }

    #[test]
    fn test_convert_scalar() {
        assert_eq!(unit("km").convert(2.0, &unit("m")), Some(2000.0));
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&unit("km/s")).unwrap();
        assert_eq!(json, "\"km/s\"");
        let back: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit("km/s"));
        assert!(serde_json::from_str::<Unit>("\"parsnip\"").is_err());
    }
}
