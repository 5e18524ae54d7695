//! Physical dimensions of a furniture piece, in centimeters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Length, width and height in centimeters.
///
/// The storefront UI bounds user input (e.g. length 50-300 cm). The pricing
/// engine itself only requires every axis to be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dimensions {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

impl Dimensions {
    /// Create validated dimensions.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if any axis is zero or negative.
    pub fn new(length: Decimal, width: Decimal, height: Decimal) -> Result<Self, CoreError> {
        let dims = Self {
            length,
            width,
            height,
        };
        dims.validate()?;
        Ok(dims)
    }

    /// Check that every axis is strictly positive.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` naming the first offending axis.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (axis, value) in [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
        ] {
            if value <= Decimal::ZERO {
                return Err(CoreError::validation(format!(
                    "dimension {axis} must be positive (got {value})"
                )));
            }
        }
        Ok(())
    }

    /// Volume in cubic centimeters, or `None` on overflow.
    #[must_use]
    pub fn volume(&self) -> Option<Decimal> {
        self.length
            .checked_mul(self.width)?
            .checked_mul(self.height)
    }

    /// Strip trailing zeros so `240.0` and `240` compare and serialize alike.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            length: self.length.normalize(),
            width: self.width.normalize(),
            height: self.height.normalize(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cm(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_new_rejects_non_positive_axis() {
        assert!(Dimensions::new(cm(240), cm(0), cm(85)).is_err());
        assert!(Dimensions::new(cm(-1), cm(95), cm(85)).is_err());
        assert!(Dimensions::new(cm(240), cm(95), cm(85)).is_ok());
    }

    #[test]
    fn test_volume() {
        let dims = Dimensions::new(cm(240), cm(95), cm(85)).unwrap();
        assert_eq!(dims.volume(), Some(cm(1_938_000)));
    }

    #[test]
    fn test_normalized_strips_trailing_zeros() {
        let a = Dimensions::new(Decimal::new(2400, 1), cm(95), cm(85)).unwrap();
        let b = Dimensions::new(cm(240), cm(95), cm(85)).unwrap();
        assert_eq!(
            serde_json::to_string(&a.normalized()).unwrap(),
            serde_json::to_string(&b.normalized()).unwrap()
        );
    }
}
