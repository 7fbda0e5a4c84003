//! Tipos de valor para montos y tasas.
//!
//! Los montos se guardan en centavos enteros y las tasas en basis points,
//! de modo que comparar contra los umbrales de tier y recalcular el historial
//! sea exacto y determinista. La conversión a dólares / fracciones sólo
//! ocurre en los bordes (JSON, CLI).
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_AMOUNT_CENTS;
use crate::errors::LedgerError;

/// Monto monetario en centavos de dólar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Money(dollars * 100)
    }

    /// Valida un monto entrante expresado en dólares decimales.
    ///
    /// Rechaza NaN, infinitos, valores no positivos y montos que redondeados
    /// al centavo quedan en cero o exceden `MAX_AMOUNT_CENTS`.
    pub fn parse_amount(dollars: f64) -> Result<Money, LedgerError> {
        if !dollars.is_finite() || dollars <= 0.0 {
            return Err(LedgerError::InvalidAmount);
        }
        let cents = (dollars * 100.0).round();
        if cents < 1.0 || cents > MAX_AMOUNT_CENTS as f64 {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Money(cents as i64))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// Tasa de comisión en basis points (1 bp = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    pub const fn bps(self) -> u32 {
        self.0
    }

    /// Tasa como fracción (`500` bps -> `0.05`).
    pub fn as_fraction(self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    /// Aplica la tasa a un monto, redondeando al centavo (half-up).
    pub fn apply(self, amount: Money) -> Money {
        let scaled = amount.cents() as i128 * self.0 as i128;
        let rounded = (scaled + 5_000).div_euclid(10_000);
        Money(rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}%")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}%", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}%")
        }
    }
}
