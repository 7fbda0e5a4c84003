//! Estado de cuenta e ingesta de comisiones.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use f0_core::CommissionEvent;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AdminKey, CurrentAccount};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Evento tal como se expone por JSON: montos en dólares, tasa como fracción.
#[derive(Serialize)]
pub struct CommissionView {
    pub id: i64,
    pub account_id: i64,
    pub order_id: Option<String>,
    pub amount: f64,
    pub rate: f64,
    pub commission: f64,
    pub created_at: DateTime<Utc>,
}

impl From<CommissionEvent> for CommissionView {
    fn from(e: CommissionEvent) -> Self {
        Self { id: e.id,
               account_id: e.account_id,
               order_id: e.order_id,
               amount: e.amount.as_dollars(),
               rate: e.rate_applied.as_fraction(),
               commission: e.commission_amount.as_dollars(),
               created_at: e.created_at }
    }
}

pub async fn statement_handler(State(state): State<AppState>,
                               CurrentAccount(account): CurrentAccount)
                               -> AppResult<Json<Vec<CommissionView>>> {
    let events = state.run(move |engine| engine.commissions_for(account.id)).await?;
    Ok(Json(events.into_iter().map(CommissionView::from).collect()))
}

#[derive(Deserialize)]
pub struct CommissionRequest {
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub referral_code: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// `POST /api/commissions` (admin): referente por id o por código.
pub async fn record_commission_handler(_: AdminKey,
                                       State(state): State<AppState>,
                                       payload: Result<Json<CommissionRequest>, JsonRejection>)
                                       -> AppResult<(StatusCode, Json<CommissionView>)> {
    let Json(body) = payload?;
    let event = match (body.account_id, body.referral_code) {
        (Some(id), _) => {
            state.run(move |engine| engine.record_commission(id, body.amount, body.order_id.as_deref()))
                 .await?
        }
        (None, Some(code)) => {
            state.run(move |engine| {
                     engine.record_commission_for_code(&code, body.amount, body.order_id.as_deref())
                 })
                 .await?
        }
        (None, None) => return Err(AppError::BadRequest("account_id or referral_code required".into())),
    };
    info!(account = event.account_id, rate_bps = event.rate_applied.bps(), "commission recorded");
    Ok((StatusCode::CREATED, Json(event.into())))
}

#[derive(Deserialize)]
pub struct OrderWebhook {
    pub discount_code: String,
    pub order_total: f64,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Serialize)]
pub struct OrderAttribution {
    pub attributed: bool,
    pub referral_code: String,
    pub commission: CommissionView,
}

/// Webhook de órdenes del sistema de pagos: el código de descuento es el
/// código de referido.
pub async fn order_webhook_handler(_: AdminKey,
                                   State(state): State<AppState>,
                                   payload: Result<Json<OrderWebhook>, JsonRejection>)
                                   -> AppResult<Json<OrderAttribution>> {
    let Json(body) = payload?;
    let code = body.discount_code.trim().to_string();
    if code.is_empty() {
        return Err(AppError::BadRequest("discount_code required".into()));
    }
    let lookup = code.clone();
    let event = state.run(move |engine| {
                         engine.record_commission_for_code(&lookup, body.order_total, body.order_id.as_deref())
                     })
                     .await?;
    Ok(Json(OrderAttribution { attributed: true,
                               referral_code: code,
                               commission: event.into() }))
}
