//! Redirect de links de referido y vistas de stats.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use f0_core::{Account, AccountStats, ClickSource, LedgerError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::CurrentAccount;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Origen de la visita: `Host`, dirección del cliente y User-Agent.
pub struct ClickOrigin(pub ClickSource);

impl<S: Send + Sync> FromRequestParts<S> for ClickOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let host = parts.headers.get(header::HOST).and_then(|v| v.to_str().ok());
        let user_agent = parts.headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok());
        // Detrás de un proxy la IP real llega en X-Forwarded-For.
        let forwarded = parts.headers
                             .get("x-forwarded-for")
                             .and_then(|v| v.to_str().ok())
                             .and_then(|v| v.split(',').next())
                             .map(|ip| ip.trim().to_string());
        let peer = parts.extensions
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string());
        let client = forwarded.or(peer);
        Ok(ClickOrigin(ClickSource::from_request(host,
                                                 client.as_deref(),
                                                 user_agent)))
    }
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// `GET /r/{*code}`: registra el click y redirige al alta. Nunca falla hacia
/// el visitante; códigos desconocidos (incluso con `/` o sólo espacios)
/// también se registran.
pub async fn redirect_handler(State(state): State<AppState>,
                              Path(raw): Path<String>,
                              ClickOrigin(source): ClickOrigin)
                              -> Response {
    let code = raw.trim().to_string();
    if code.is_empty() {
        let recorded = state.run(move |engine| {
                                engine.record_click(&raw, &source);
                                Ok(())
                            })
                            .await;
        if let Err(e) = recorded {
            warn!("redirect: click task failed err={e}");
        }
        return found("/");
    }
    let lookup = code.clone();
    let resolved = state.run(move |engine| {
                            engine.record_click(&lookup, &source);
                            match engine.account_by_code(&lookup) {
                                Ok(_) => Ok(true),
                                Err(LedgerError::UnknownAccount) => Ok(false),
                                Err(e) => Err(e),
                            }
                        })
                        .await;
    match resolved {
        Ok(true) => found(&format!("/join?ref={code}")),
        Ok(false) => found("/join"),
        Err(e) => {
            warn!("redirect: lookup failed code={code} err={e}");
            found("/join")
        }
    }
}

pub async fn empty_code_handler() -> Response {
    found("/")
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub referral_code: String,
    pub share_url: String,
    pub clicks: u64,
    pub signups: u64,
    pub conversions: u64,
    /// Porcentaje de clicks convertidos, un decimal; 0 sin clicks.
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub total_commission: f64,
    pub current_rate: f64,
    pub next_tier_at: Option<f64>,
}

impl StatsResponse {
    fn new(state: &AppState, stats: AccountStats) -> Self {
        Self { share_url: state.config.share_url(&stats.referral_code),
               referral_code: stats.referral_code.clone(),
               clicks: stats.click_count,
               signups: stats.referred_signup_count,
               conversions: stats.conversions,
               conversion_rate: stats.conversion_rate(),
               total_revenue: stats.total_attributed_revenue.as_dollars(),
               total_commission: stats.total_commission_earned.as_dollars(),
               current_rate: stats.current_rate.as_fraction(),
               next_tier_at: stats.next_breakpoint.map(|m| m.as_dollars()) }
    }
}

pub async fn stats_handler(State(state): State<AppState>,
                           CurrentAccount(account): CurrentAccount)
                           -> AppResult<Json<StatsResponse>> {
    let stats = state.run(move |engine| engine.stats_for(account.id)).await?;
    Ok(Json(StatsResponse::new(&state, stats)))
}

#[derive(Deserialize)]
pub struct CodeQuery {
    #[serde(default)]
    pub code: String,
}

/// Stats públicas por código (sin autenticación).
pub async fn affiliate_stats_handler(State(state): State<AppState>,
                                     query: Result<Query<CodeQuery>, QueryRejection>)
                                     -> AppResult<Json<StatsResponse>> {
    let Query(query) = query?;
    let code = query.code.trim().to_string();
    if code.is_empty() {
        return Err(AppError::BadRequest("code required".into()));
    }
    let stats = state.run(move |engine| engine.stats_for_code(&code)).await?;
    Ok(Json(StatsResponse::new(&state, stats)))
}

pub async fn referrals_handler(State(state): State<AppState>,
                               CurrentAccount(account): CurrentAccount)
                               -> AppResult<Json<Vec<Account>>> {
    let referred = state.run(move |engine| engine.referred_accounts_of(account.id)).await?;
    Ok(Json(referred))
}
