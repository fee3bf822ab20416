//! Fixed-point money.
//!
//! Amounts display as dollars with thousands separators, e.g. `$1,234.56`.

use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub},
};

use serde::{Deserialize, Serialize};

/// An amount of money in whole cents.
///
/// Prices are kept as integers so that breakdowns add up exactly.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a number of cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates an amount from a whole number of dollars.
    #[must_use]
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let digits = (abs / 100).to_string();
        let mut dollars = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, digit) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                dollars.push(',');
            }
            dollars.push(digit);
        }
        write!(f, "{sign}${dollars}.{:02}", abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * i64::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0, "$0.00"; "zero")]
    #[test_case(5, "$0.05"; "cents only")]
    #[test_case(99_999, "$999.99"; "below a thousand")]
    #[test_case(123_456, "$1,234.56"; "dollars and cents")]
    #[test_case(32_000_000, "$320,000.00"; "house price")]
    #[test_case(12_345_678_900, "$123,456,789.00"; "millions")]
    #[test_case(-2_500, "-$25.00"; "negative")]
    #[test_case(-1_500_000, "-$15,000.00"; "negative thousands")]
    fn display(cents: i64, expected: &str) {
        assert_eq!(Money::from_cents(cents).to_string(), expected);
    }

    #[test]
    fn arithmetic() {
        let total: Money = [Money::from_dollars(10), Money::from_cents(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(1_050));
        assert_eq!(Money::from_dollars(3) * 2, Money::from_dollars(6));
        assert_eq!(-Money::from_dollars(1), Money::from_cents(-100));
    }
}
