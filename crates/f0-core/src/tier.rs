//! Resolvedor de tiers de comisión.
//!
//! Función pura: revenue acumulado atribuido -> tasa vigente para eventos
//! nuevos. La tabla se recorre desde el umbral más alto hacia abajo y se
//! devuelve el primero que el valor alcanza (borde inferior inclusivo).
//! El tier nunca se persiste: siempre se deriva del historial.
use crate::money::{Money, Rate};

/// Tasa base (tier más bajo), vigente con revenue acumulado 0.
pub const BASE_RATE: Rate = Rate::from_bps(500);

/// Breakpoints ordenados de mayor a menor umbral.
pub const TIER_BREAKPOINTS: [(Money, Rate); 4] = [(Money::from_dollars(250_000), Rate::from_bps(300)),
                                                  (Money::from_dollars(50_000), Rate::from_bps(350)),
                                                  (Money::from_dollars(10_000), Rate::from_bps(400)),
                                                  (Money::ZERO, BASE_RATE)];

/// Tasa vigente para un revenue acumulado. Total y monótona no creciente.
pub fn rate_for(cumulative_revenue: Money) -> Rate {
    TIER_BREAKPOINTS.iter()
                    .find(|(threshold, _)| cumulative_revenue >= *threshold)
                    .map(|(_, rate)| *rate)
                    .unwrap_or(BASE_RATE)
}

/// Próximo umbral (si existe) a partir del cual la tasa baja.
pub fn next_breakpoint(cumulative_revenue: Money) -> Option<Money> {
    TIER_BREAKPOINTS.iter()
                    .rev()
                    .map(|(threshold, _)| *threshold)
                    .find(|threshold| *threshold > cumulative_revenue)
}
