use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use f0_gate::{FormSubmission, GateRequest, GateResponse};

use crate::auth::AdminKey;
use crate::error::AppResult;
use crate::state::AppState;

/// `POST /api/gate`: acciones desconocidas o campos faltantes son 400.
pub async fn gate_handler(State(state): State<AppState>,
                          payload: Result<Json<GateRequest>, JsonRejection>)
                          -> AppResult<Json<GateResponse>> {
    let Json(request) = payload?;
    Ok(Json(state.run_gate(move |gate| gate.handle(request)).await?))
}

/// `GET /api/gate/forms/{form}`: envíos del formulario (requiere `X-Admin-Key`).
pub async fn form_submissions_handler(State(state): State<AppState>,
                                      _admin: AdminKey,
                                      Path(form): Path<String>)
                                      -> AppResult<Json<Vec<FormSubmission>>> {
    let submissions = state.run_gate(move |gate| gate.form_submissions(&form, Utc::now())).await?;
    Ok(Json(submissions))
}
