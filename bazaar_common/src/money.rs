use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------       Money        -----------------------------------------------------------
/// An amount of money, stored as a whole number of minor currency units (cents).
///
/// All order totals and price snapshots in the system are `Money` values. Using integer cents avoids the usual
/// floating-point accumulation errors when summing line items.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a decimal amount ("12.50") into whole cents. At most two fractional digits are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '.');
        let whole = parts
            .next()
            .ok_or_else(|| MoneyConversionError(s.to_string()))?
            .parse::<i64>()
            .map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        let cents = match parts.next() {
            None => 0,
            Some(frac) if frac.len() <= 2 && !frac.is_empty() => {
                let v = frac.parse::<i64>().map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
                if frac.len() == 1 {
                    v * 10
                } else {
                    v
                }
            },
            Some(frac) => return Err(MoneyConversionError(format!("{s}: invalid fraction '{frac}'"))),
        };
        let sign = if whole < 0 || s.trim_start().starts_with('-') { -1 } else { 1 };
        Ok(Self(whole * 100 + sign * cents))
    }
}

#[cfg(test)]
mod test {
    use super::Money;

    #[test]
    fn arithmetic() {
        let a = Money::from(1000);
        let b = Money::from(250);
        assert_eq!(a + b, Money::from(1250));
        assert_eq!(a - b, Money::from(750));
        assert_eq!(b * 3, Money::from(750));
        assert_eq!([a, b, b].into_iter().sum::<Money>(), Money::from(1500));
    }

    #[test]
    fn display_as_decimal() {
        assert_eq!(Money::from(123_45).to_string(), "123.45");
        assert_eq!(Money::from(5).to_string(), "0.05");
        assert_eq!(Money::from(-250).to_string(), "-2.50");
    }

    #[test]
    fn parse_decimal() {
        assert_eq!("12.50".parse::<Money>().unwrap(), Money::from(1250));
        assert_eq!("12.5".parse::<Money>().unwrap(), Money::from(1250));
        assert_eq!("12".parse::<Money>().unwrap(), Money::from(1200));
        assert!("12.505".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }
}
