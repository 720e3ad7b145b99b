//! Fixed-point currency and percentage types with 2 decimal places.
//!
//! Uses `rust_decimal` internally with scale enforcement so that splits,
//! balances and settlement amounts reconcile to the cent without any
//! floating-point drift.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of decimal places kept for every monetary value.
pub const SCALE: u32 = 2;

/// Rounds a raw decimal to 2 places, midpoints away from zero.
///
/// ```
/// use rust_decimal::Decimal;
/// use split_ledger::decimal::round2;
///
/// assert_eq!(round2(Decimal::new(12345, 3)).to_string(), "12.35");
/// assert_eq!(round2(Decimal::new(-12345, 3)).to_string(), "-12.35");
/// ```
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    if rounded.is_zero() {
        // never print "-0.00"
        rounded.set_sign_positive(true);
    }
    rounded
}

/// A currency amount that always carries exactly 2 decimal places.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use split_ledger::Money;
///
/// let amount = Money::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Creates a new `Money`, rounding to 2 decimal places.
    pub fn new(value: Decimal) -> Self {
        Money(round2(value))
    }

    /// Creates a `Money` from an integer number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, SCALE))
    }

    /// The underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Splits this amount into `parts` shares rounded to the cent.
    ///
    /// Returns `None` when `parts` is zero.
    pub fn per_head(&self, parts: usize) -> Option<Self> {
        if parts == 0 {
            return None;
        }
        Some(Money::new(self.0 / Decimal::from(parts)))
    }

    /// The share of this amount for `percent`, rounded to the cent.
    ///
    /// Returns `None` if the product does not fit in a `Decimal`.
    pub fn share_of(&self, percent: Percent) -> Option<Self> {
        let ratio = percent.value() / Decimal::ONE_HUNDRED;
        self.0.checked_mul(ratio).map(Money::new)
    }

    /// Addition that returns `None` instead of panicking on overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money::new)
    }

    /// Subtraction that returns `None` instead of panicking on overflow.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Money::new)
    }

    /// Sums `amounts`, or `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        Ok(Money::new(decimal))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money::new(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Money::new(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Money::new(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// A percentage with 2 decimal places (`40.00` means forty percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Self = Percent(Decimal::ZERO);

    /// One hundred percent, the required total of a percentage split.
    pub const WHOLE: Self = Percent(Decimal::ONE_HUNDRED);

    pub fn new(value: Decimal) -> Self {
        Percent(round2(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Percent::new)
    }

    /// Sums `percents`, or `None` on overflow.
    pub fn checked_sum<I>(percents: I) -> Option<Self>
    where
        I: IntoIterator<Item = Percent>,
    {
        percents
            .into_iter()
            .try_fold(Percent::ZERO, |acc, percent| acc.checked_add(percent))
    }
}

impl FromStr for Percent {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%');
        Ok(Percent::new(Decimal::from_str(trimmed)?))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
