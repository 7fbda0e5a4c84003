//! Alta, login y alta self-service de afiliados.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use f0_core::{Account, Enrollment};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::CurrentAccount;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    #[serde(default, rename = "ref")]
    pub referral: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub email: String,
    pub referral_code: String,
    pub share_url: String,
    pub expires_at: DateTime<Utc>,
    /// Sólo en el alta; es la credencial de `/api/login`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
}

pub async fn signup_handler(State(state): State<AppState>,
                            payload: Result<Json<SignupRequest>, JsonRejection>)
                            -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let Json(body) = payload?;
    let Enrollment { account, session, license_key } =
        state.run(move |engine| engine.signup(&body.email, body.referral.as_deref())).await?;
    info!(account = account.id, referred = account.referred_by.is_some(), "signup");
    Ok((StatusCode::CREATED,
        Json(SessionResponse { share_url: state.config.share_url(&account.referral_code),
                               token: session.token,
                               email: account.email,
                               referral_code: account.referral_code,
                               expires_at: session.expires_at,
                               license_key: Some(license_key) })))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub key: String,
}

pub async fn login_handler(State(state): State<AppState>,
                           payload: Result<Json<LoginRequest>, JsonRejection>)
                           -> AppResult<Json<SessionResponse>> {
    let Json(body) = payload?;
    let (account, session) = state.run(move |engine| engine.login(&body.email, &body.key)).await?;
    Ok(Json(SessionResponse { share_url: state.config.share_url(&account.referral_code),
                              token: session.token,
                              email: account.email,
                              referral_code: account.referral_code,
                              expires_at: session.expires_at,
                              license_key: None }))
}

pub async fn me_handler(CurrentAccount(account): CurrentAccount) -> Json<Account> {
    Json(account)
}

#[derive(Serialize)]
pub struct JoinResponse {
    pub email: String,
    pub referral_code: String,
    pub short_url: String,
    pub share_url: String,
    pub clicks: u64,
    pub returning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,
}

/// Idempotente por email: 201 al crear, 200 si la cuenta ya existía. Sólo
/// el alta nueva entrega token y clave de licencia.
pub async fn join_handler(State(state): State<AppState>,
                          payload: Result<Json<SignupRequest>, JsonRejection>)
                          -> AppResult<(StatusCode, Json<JoinResponse>)> {
    let Json(body) = payload?;
    let outcome = state.run(move |engine| engine.join(&body.email, body.referral.as_deref()))
                       .await?;
    let status = if outcome.returning { StatusCode::OK } else { StatusCode::CREATED };
    let (token, license_key) = match outcome.enrollment {
        Some(enrollment) => (Some(enrollment.session.token), Some(enrollment.license_key)),
        None => (None, None),
    };
    let code = outcome.account.referral_code;
    Ok((status,
        Json(JoinResponse { email: outcome.account.email,
                            short_url: format!("/r/{code}"),
                            share_url: state.config.share_url(&code),
                            referral_code: code,
                            clicks: outcome.clicks,
                            returning: outcome.returning,
                            token,
                            license_key })))
}
