use serde::{Deserialize, Serialize};

use crate::money::{Money, Rate};

/// Vista de dashboard por cuenta. Se compone en cada lectura; nunca se cachea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStats {
    pub referral_code: String,
    pub click_count: u64,
    pub referred_signup_count: u64,
    /// Altas atribuidas a los clicks del código (hoy, las cuentas referidas).
    pub conversions: u64,
    pub total_attributed_revenue: Money,
    pub total_commission_earned: Money,
    pub current_rate: Rate,
    /// Umbral de revenue donde empieza el siguiente tier, si queda alguno.
    pub next_breakpoint: Option<Money>,
}

impl AccountStats {
    /// `conversions / clicks * 100` redondeado a un decimal; 0 sin clicks.
    pub fn conversion_rate(&self) -> f64 {
        if self.click_count == 0 {
            return 0.0;
        }
        let pct = self.conversions as f64 / self.click_count as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    }
}
