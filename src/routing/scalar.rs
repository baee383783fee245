//! Path argument conversion.
//!
//! Path arguments are restricted to a closed set of scalar kinds. A kind is
//! fixed per parameter when the route is compiled; [`convert`] is the only
//! place raw path text turns into a typed value.

use std::fmt;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Bit width of an integer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    /// Pointer width (`isize` / `usize`).
    Size,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
            IntWidth::Size => usize::BITS,
        }
    }
}

/// Bit width of a floating-point parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    W32,
    W64,
}

/// Conversion applied to a path-bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Str,
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Str => f.write_str("string"),
            ScalarKind::Bool => f.write_str("bool"),
            ScalarKind::Int(w) => write!(f, "int{}", w.bits()),
            ScalarKind::Uint(w) => write!(f, "uint{}", w.bits()),
            ScalarKind::Float(FloatWidth::W32) => f.write_str("float32"),
            ScalarKind::Float(FloatWidth::W64) => f.write_str("float64"),
        }
    }
}

/// A converted path argument, widened to its kind's largest representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
}

#[derive(Debug, Error, PartialEq)]
pub enum ScalarError {
    #[error("invalid bool '{0}': expected 'true' or 'false'")]
    Bool(String),

    #[error("invalid integer '{raw}': {source}")]
    Int {
        raw: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid float '{raw}': {source}")]
    Float {
        raw: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("value '{raw}' out of range for {kind}")]
    OutOfRange { raw: String, kind: ScalarKind },
}

/// Convert raw path text according to `kind`.
pub fn convert(kind: ScalarKind, raw: &str) -> Result<Scalar, ScalarError> {
    let out_of_range = || ScalarError::OutOfRange {
        raw: raw.to_string(),
        kind,
    };
    let invalid_int = |source| ScalarError::Int {
        raw: raw.to_string(),
        source,
    };

    match kind {
        ScalarKind::Str => Ok(Scalar::Str(raw.to_string())),
        ScalarKind::Bool => match raw {
            "true" => Ok(Scalar::Bool(true)),
            "false" => Ok(Scalar::Bool(false)),
            _ => Err(ScalarError::Bool(raw.to_string())),
        },
        ScalarKind::Int(width) => {
            let value = raw.parse::<i64>().map_err(invalid_int)?;
            let bits = width.bits();
            if bits < 64 {
                let max = (1i64 << (bits - 1)) - 1;
                let min = -(1i64 << (bits - 1));
                if value < min || value > max {
                    return Err(out_of_range());
                }
            }
            Ok(Scalar::Int(value))
        }
        ScalarKind::Uint(width) => {
            let value = raw.parse::<u64>().map_err(invalid_int)?;
            let bits = width.bits();
            if bits < 64 && value > (1u64 << bits) - 1 {
                return Err(out_of_range());
            }
            Ok(Scalar::Uint(value))
        }
        ScalarKind::Float(width) => {
            let value = raw.parse::<f64>().map_err(|source| ScalarError::Float {
                raw: raw.to_string(),
                source,
            })?;
            if width == FloatWidth::W32 && value.is_finite() && (value as f32).is_infinite() {
                return Err(out_of_range());
            }
            Ok(Scalar::Float(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_passthrough() {
        assert_eq!(convert(ScalarKind::Str, "a b%20"), Ok(Scalar::Str("a b%20".into())));
        assert_eq!(convert(ScalarKind::Str, ""), Ok(Scalar::Str(String::new())));
    }

    #[test]
    fn test_bool_is_canonical() {
        assert_eq!(convert(ScalarKind::Bool, "true"), Ok(Scalar::Bool(true)));
        assert_eq!(convert(ScalarKind::Bool, "false"), Ok(Scalar::Bool(false)));
        for raw in ["True", "1", "t", "abc", ""] {
            assert!(convert(ScalarKind::Bool, raw).is_err(), "{} accepted", raw);
        }
    }

    #[test]
    fn test_int_width_range() {
        let i8k = ScalarKind::Int(IntWidth::W8);
        assert_eq!(convert(i8k, "127"), Ok(Scalar::Int(127)));
        assert_eq!(convert(i8k, "-128"), Ok(Scalar::Int(-128)));
        assert!(matches!(convert(i8k, "128"), Err(ScalarError::OutOfRange { .. })));
        assert!(matches!(convert(i8k, "-129"), Err(ScalarError::OutOfRange { .. })));

        let i64k = ScalarKind::Int(IntWidth::W64);
        assert_eq!(convert(i64k, "-9223372036854775808"), Ok(Scalar::Int(i64::MIN)));
        assert!(matches!(convert(i64k, "9223372036854775808"), Err(ScalarError::Int { .. })));
        assert!(convert(i64k, "1.2").is_err());
        assert!(convert(i64k, "abc").is_err());
    }

    #[test]
    fn test_uint_width_range() {
        let u16k = ScalarKind::Uint(IntWidth::W16);
        assert_eq!(convert(u16k, "65535"), Ok(Scalar::Uint(65535)));
        assert!(matches!(convert(u16k, "65536"), Err(ScalarError::OutOfRange { .. })));
        assert!(matches!(convert(u16k, "-1"), Err(ScalarError::Int { .. })));

        let u64k = ScalarKind::Uint(IntWidth::W64);
        assert_eq!(convert(u64k, "18446744073709551615"), Ok(Scalar::Uint(u64::MAX)));
    }

    #[test]
    fn test_float_width_range() {
        let f32k = ScalarKind::Float(FloatWidth::W32);
        assert_eq!(convert(f32k, "123.5"), Ok(Scalar::Float(123.5)));
        assert!(matches!(convert(f32k, "1e300"), Err(ScalarError::OutOfRange { .. })));

        let f64k = ScalarKind::Float(FloatWidth::W64);
        assert_eq!(convert(f64k, "1e300"), Ok(Scalar::Float(1e300)));
        assert!(convert(f64k, "abc").is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ScalarKind::Int(IntWidth::W32).to_string(), "int32");
        assert_eq!(ScalarKind::Uint(IntWidth::W8).to_string(), "uint8");
        assert_eq!(ScalarKind::Float(FloatWidth::W64).to_string(), "float64");
    }
}
