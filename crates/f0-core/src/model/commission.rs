//! Eventos de comisión.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountId;
use crate::money::{Money, Rate};
use crate::tier::rate_for;

/// Transacción con revenue atribuida a una cuenta referente.
///
/// `rate_applied` es un snapshot de la tasa vigente al registrar: cambios de
/// tier posteriores (o de la tabla en otro deploy) no alteran filas previas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionEvent {
    pub id: i64,
    pub account_id: AccountId,
    pub order_id: Option<String>,
    pub amount: Money,
    pub rate_applied: Rate,
    pub commission_amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Evento ya tarifado, listo para anexar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionDraft {
    pub account_id: AccountId,
    pub order_id: Option<String>,
    pub amount: Money,
    pub rate_applied: Rate,
    pub commission_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl CommissionDraft {
    /// Tarifa un monto contra el acumulado *previo* de la cuenta.
    ///
    /// Debe invocarse dentro de la sección crítica por cuenta del store: el
    /// `prior_cumulative` tiene que incluir todos los eventos ya anexados.
    pub fn price(account_id: AccountId,
                 prior_cumulative: Money,
                 amount: Money,
                 order_id: Option<&str>,
                 created_at: DateTime<Utc>)
                 -> Self {
        let rate_applied = rate_for(prior_cumulative);
        Self { account_id,
               order_id: order_id.map(str::to_string),
               amount,
               rate_applied,
               commission_amount: rate_applied.apply(amount),
               created_at }
    }

    pub fn into_event(self, id: i64) -> CommissionEvent {
        CommissionEvent { id,
                          account_id: self.account_id,
                          order_id: self.order_id,
                          amount: self.amount,
                          rate_applied: self.rate_applied,
                          commission_amount: self.commission_amount,
                          created_at: self.created_at }
    }
}
