//! Whole-Toman money amounts.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Toman-to-Rial multiplier applied before an amount reaches the provider.
pub const RIAL_PER_TOMAN: u64 = 10;

/// Price or payment amount in whole Toman.
///
/// The platform currency has no minor unit. The payment provider bills in
/// Rial, so [`Amount::to_rial`] is the only conversion point.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = u64, example = 50000)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount; free content is priced at `ZERO`.
    pub const ZERO: Self = Self(0);

    /// Wraps a whole-Toman value.
    #[must_use]
    pub const fn new(toman: u64) -> Self {
        Self(toman)
    }

    /// Returns the value in Toman.
    #[must_use]
    pub const fn toman(self) -> u64 {
        self.0
    }

    /// Returns `true` for a zero amount.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Converts to the provider's Rial unit, or `None` on overflow.
    #[must_use]
    pub const fn to_rial(self) -> Option<u64> {
        self.0.checked_mul(RIAL_PER_TOMAN)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} toman", self.0)
    }
}

impl From<u64> for Amount {
    fn from(toman: u64) -> Self {
        Self(toman)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_rial_multiplies_by_ten() {
        assert_eq!(Amount::new(50_000).to_rial(), Some(500_000));
        assert_eq!(Amount::ZERO.to_rial(), Some(0));
    }

    #[test]
    fn to_rial_detects_overflow() {
        assert_eq!(Amount::new(u64::MAX).to_rial(), None);
    }

    #[test]
    fn display_includes_unit() {
        assert_eq!(Amount::new(1200).to_string(), "1200 toman");
    }
}
