//! Money represented in integer cents.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole dollar value.
    pub const fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Multiplies by a quantity, saturating at the `i64` bounds.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(4550).to_string(), "$45.50");
        assert_eq!(Money::from_cents(-305).to_string(), "-$3.05");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_multiply() {
        assert_eq!(Money::from_dollars(45).multiply(10), Money::from_cents(45_000));
    }

    #[test]
    fn test_multiply_saturates_instead_of_overflowing() {
        let huge = Money::from_cents(100_000_000_000_000_000);
        assert_eq!(huge.multiply(100), Money::from_cents(i64::MAX));
        assert_eq!(
            Money::from_cents(-huge.cents()).multiply(100),
            Money::from_cents(i64::MIN)
        );
    }

    #[test]
    fn test_ordering_follows_cents() {
        assert!(Money::from_dollars(40) < Money::from_dollars(45));
        assert!(Money::from_cents(1).is_positive());
        assert!(!Money::zero().is_positive());
    }
}
