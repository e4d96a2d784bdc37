use std::fmt;
use std::ops::Sub;

use crate::error::ValidationError;

/// Number of fractional digits a pair is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Digits {
    Three,
    Five,
}

impl Digits {
    pub fn count(self) -> u32 {
        match self {
            Digits::Three => 3,
            Digits::Five => 5,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Digits::Three => 1_000.0,
            Digits::Five => 100_000.0,
        }
    }
}

impl TryFrom<u32> for Digits {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Digits::Three),
            5 => Ok(Digits::Five),
            other => Err(ValidationError::InvalidDigits(other)),
        }
    }
}

/// Fixed-point price scaled by 10^digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rate(i32);

impl Rate {
    pub const MIN_VALUE: i32 = 1;
    pub const MAX_VALUE: i32 = 999_999;

    pub fn from_int(value: i32) -> Result<Self, ValidationError> {
        if !(Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value) {
            return Err(ValidationError::RateOutOfRange {
                value: value as i64,
            });
        }
        Ok(Rate(value))
    }

    /// Rounds half-up to the nearest unit at the given precision.
    pub fn from_float(value: f64, digits: Digits) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidFloatRate {
            value,
            digits: digits.count(),
        };

        if !value.is_finite() {
            return Err(invalid());
        }

        let scaled = round_half_up(value, digits);
        if scaled < Self::MIN_VALUE as f64 || scaled > Self::MAX_VALUE as f64 {
            return Err(ValidationError::RateOutOfRange {
                value: scaled as i64,
            });
        }

        let rate = Rate(scaled as i32);
        if round_half_up(rate.as_float(digits), digits) as i32 != rate.0 {
            return Err(invalid());
        }

        Ok(rate)
    }

    /// True when `value` is in range and already rounded to `digits`.
    pub fn is_rate(value: f64, digits: Digits) -> bool {
        if !value.is_finite() {
            return false;
        }

        let min = Self::MIN_VALUE as f64 / digits.factor();
        let max = Self::MAX_VALUE as f64 / digits.factor();
        if value < min || value > max {
            return false;
        }

        round_half_up(value, digits) / digits.factor() == value
    }

    pub(crate) fn new_unchecked(value: i32) -> Self {
        debug_assert!((Self::MIN_VALUE..=Self::MAX_VALUE).contains(&value));
        Rate(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn as_float(self, digits: Digits) -> f64 {
        self.0 as f64 / digits.factor()
    }

    pub fn checked_add(self, delta: i32) -> Result<Self, ValidationError> {
        match self.0.checked_add(delta) {
            Some(value) => Self::from_int(value),
            None => Err(ValidationError::RateOutOfRange {
                value: self.0 as i64 + delta as i64,
            }),
        }
    }

    pub fn format(self, digits: Digits) -> String {
        format!("{:.*}", digits.count() as usize, self.as_float(digits))
    }
}

fn round_half_up(value: f64, digits: Digits) -> f64 {
    (value * digits.factor() + 0.5).floor()
}

impl Sub for Rate {
    type Output = i32;

    fn sub(self, rhs: Rate) -> i32 {
        self.0 - rhs.0
    }
}

impl TryFrom<i32> for Rate {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Rate::from_int(value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_int_bounds() {
        assert!(Rate::from_int(0).is_err());
        assert!(Rate::from_int(1_000_000).is_err());
        assert_eq!(Rate::from_int(1).unwrap().value(), 1);
        assert_eq!(Rate::from_int(999_999).unwrap().value(), 999_999);
    }

    #[test]
    fn test_from_float_rounds_half_up() {
        assert_eq!(Rate::from_float(1.2345651, Digits::Five).unwrap().value(), 123_457);
        assert_eq!(Rate::from_float(1.2345649, Digits::Five).unwrap().value(), 123_456);
        assert_eq!(Rate::from_float(123.45651, Digits::Three).unwrap().value(), 123_457);
    }

    #[test]
    fn test_from_float_rejects_out_of_range() {
        assert!(Rate::from_float(0.0, Digits::Five).is_err());
        assert!(Rate::from_float(10.0, Digits::Five).is_err());
        assert!(Rate::from_float(1000.0, Digits::Three).is_err());
        assert!(Rate::from_float(f64::NAN, Digits::Three).is_err());
    }

    #[test]
    fn test_is_rate() {
        assert!(Rate::is_rate(0.00001, Digits::Five));
        assert!(Rate::is_rate(9.99999, Digits::Five));
        assert!(!Rate::is_rate(10.0, Digits::Five));
        assert!(!Rate::is_rate(1.234567, Digits::Five));
        assert!(Rate::is_rate(0.001, Digits::Three));
        assert!(Rate::is_rate(999.999, Digits::Three));
        assert!(!Rate::is_rate(0.0001, Digits::Three));
    }

    #[test]
    fn test_invalid_digits() {
        assert_eq!(Digits::try_from(4), Err(ValidationError::InvalidDigits(4)));
        assert_eq!(Digits::try_from(5), Ok(Digits::Five));
    }

    #[test]
    fn test_format() {
        let rate = Rate::from_int(108_512).unwrap();
        assert_eq!(rate.format(Digits::Five), "1.08512");
        assert_eq!(rate.format(Digits::Three), "108.512");
        assert_eq!(Rate::from_int(100_000).unwrap().format(Digits::Five), "1.00000");
    }

    #[test]
    fn test_checked_add() {
        let rate = Rate::from_int(10).unwrap();
        assert_eq!(rate.checked_add(5).unwrap().value(), 15);
        assert!(rate.checked_add(-10).is_err());
        assert_eq!(Rate::from_int(15).unwrap() - rate, 5);
    }

    #[test]
    fn test_float_round_trip_full_domain() {
        for digits in [Digits::Three, Digits::Five] {
            for value in Rate::MIN_VALUE..=Rate::MAX_VALUE {
                let rate = Rate::from_int(value).unwrap();
                assert_eq!(Rate::from_float(rate.as_float(digits), digits).unwrap(), rate);
            }
        }
    }
}
