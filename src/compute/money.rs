//! Fixed-point monetary amounts and the payment balance guard.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Empty amount")]
    Empty,
    #[error("Invalid amount '{0}'")]
    Invalid(String),
    #[error("Amount '{0}' is out of range")]
    Overflow(String),
}

/// An amount in whole cents.
///
/// All balance comparisons happen on this integer representation so that
/// `0.1 + 0.2`-style float error can never produce a false "exceeds balance".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Rounds a float to the nearest cent (half away from zero).
    pub fn from_f64(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    /// Parses decimal text such as `150`, `150.5`, `-3.25` or `1,250.00`.
    ///
    /// Digits beyond the second decimal place are rounded half away from zero.
    /// A leading currency symbol is tolerated since users paste from statements.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MoneyError::Empty);
        }
        let invalid = || MoneyError::Invalid(trimmed.to_string());
        let overflow = || MoneyError::Overflow(trimmed.to_string());

        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let body = body.strip_prefix('$').unwrap_or(body);
        let cleaned: String = body.chars().filter(|&c| c != ',').collect();

        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole_val: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| overflow())? };
        let mut frac_digits = frac.chars().map(|c| i64::from(c as u8 - b'0'));
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().map_or(false, |d| d >= 5);

        let cents = whole_val
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(overflow)?;

        Ok(Self(if negative { -cents } else { cents }))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// The outcome of checking an entered payment against the outstanding balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCheck {
    Ok,
    /// Nothing entered yet; the required-field rule owns this case.
    Blank,
    /// Text that is not an amount (mid-typing `12.` is accepted, `12a` is not).
    Invalid,
    NotPositive,
    ExceedsBalance,
}

/// Remaining balance preview: `max(balance - amount, 0)`.
///
/// A blank or unreadable amount leaves the whole balance outstanding.
pub fn remaining_balance(balance: Money, amount: Option<Money>) -> Money {
    let paid = amount.unwrap_or(Money::ZERO);
    let remaining = balance.saturating_sub(paid);
    if remaining < Money::ZERO {
        Money::ZERO
    } else {
        remaining
    }
}

/// "The amount entered today must not exceed the outstanding balance."
pub fn check_payment(balance: Money, amount: Result<Money, MoneyError>) -> BalanceCheck {
    match amount {
        Err(MoneyError::Empty) => BalanceCheck::Blank,
        Err(_) => BalanceCheck::Invalid,
        Ok(a) if !a.is_positive() => BalanceCheck::NotPositive,
        Ok(a) if a > balance => BalanceCheck::ExceedsBalance,
        Ok(_) => BalanceCheck::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("150", 15000)]
    #[case("150.00", 15000)]
    #[case("150.5", 15050)]
    #[case("0.07", 7)]
    #[case(".5", 50)]
    #[case("12.", 1200)]
    #[case("1,250.99", 125099)]
    #[case("$20.10", 2010)]
    #[case("-3.25", -325)]
    #[case("2.345", 235)] // Rounded half away from zero
    #[case("2.344", 234)]
    fn test_parse(#[case] input: &str, #[case] cents: i64) {
        assert_eq!(Money::parse(input).unwrap().cents(), cents, "Input: {}", input);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Money::parse("  "), Err(MoneyError::Empty));
        for input in ["abc", "12a", "1.2.3", ".", "--5", "99999999999999999999"] {
            assert!(Money::parse(input).is_err(), "Should fail: '{}'", input);
        }
    }

    #[test]
    fn test_float_rounding_to_cents() {
        // 0.1 + 0.2 == 0.30000000000000004 in binary floating point.
        assert_eq!(Money::from_f64(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_f64(f64::NAN), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(15000).to_string(), "150.00");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
        assert_eq!(Money::from_cents(-325).to_string(), "-3.25");
    }

    #[test]
    fn test_remaining_is_clamped() {
        let balance = Money::parse("150.00").unwrap();
        let over = Money::parse("200.00").unwrap();
        assert_eq!(remaining_balance(balance, Some(over)), Money::ZERO);
        assert_eq!(remaining_balance(balance, None), balance);
        assert_eq!(remaining_balance(balance, Money::parse("49.99").ok()).to_string(), "100.01");
    }

    #[rstest]
    #[case("150.00", "200.00", BalanceCheck::ExceedsBalance)]
    #[case("150.00", "150.00", BalanceCheck::Ok)]
    #[case("150.00", "150.001", BalanceCheck::Ok)] // Rounds to 150.00 before comparing
    #[case("150.00", "150.005", BalanceCheck::ExceedsBalance)]
    #[case("150.00", "0", BalanceCheck::NotPositive)]
    #[case("150.00", "-5", BalanceCheck::NotPositive)]
    #[case("150.00", "", BalanceCheck::Blank)]
    #[case("150.00", "1O0", BalanceCheck::Invalid)]
    fn test_check_payment(#[case] balance: &str, #[case] amount: &str, #[case] expected: BalanceCheck) {
        let balance = Money::parse(balance).unwrap();
        assert_eq!(check_payment(balance, Money::parse(amount)), expected);
    }

    const LIMIT: i64 = 100_000_000_000;

    proptest! {
        #[test]
        fn prop_remaining_is_never_negative(balance in -LIMIT..LIMIT, amount in -LIMIT..LIMIT) {
            let remaining = remaining_balance(Money::from_cents(balance), Some(Money::from_cents(amount)));
            prop_assert!(remaining >= Money::ZERO);
        }

        #[test]
        fn prop_overpayment_always_exceeds(balance in 0..LIMIT, excess in 1..LIMIT) {
            let balance = Money::from_cents(balance);
            let amount = Money::from_cents(balance.cents() + excess);
            prop_assert_eq!(check_payment(balance, Ok(amount)), BalanceCheck::ExceedsBalance);
            prop_assert_eq!(remaining_balance(balance, Some(amount)), Money::ZERO);
        }

        #[test]
        fn prop_payment_within_balance_leaves_the_difference(balance in 1..LIMIT, paid in 1..LIMIT) {
            prop_assume!(paid <= balance);
            let (balance, paid) = (Money::from_cents(balance), Money::from_cents(paid));
            prop_assert_eq!(check_payment(balance, Ok(paid)), BalanceCheck::Ok);
            prop_assert_eq!(remaining_balance(balance, Some(paid)).cents(), balance.cents() - paid.cents());
        }
    }
}
