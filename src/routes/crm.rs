//! Contactos y feed de actividad.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use f0_core::{Activity, Contact, ContactPatch, NewContact};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentAccount;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn list_contacts_handler(State(state): State<AppState>,
                                   CurrentAccount(account): CurrentAccount,
                                   query: Result<Query<SearchQuery>, QueryRejection>)
                                   -> AppResult<Json<Vec<Contact>>> {
    let Query(query) = query?;
    let contacts = state.run(move |engine| engine.list_contacts(account.id, query.q.as_deref()))
                        .await?;
    Ok(Json(contacts))
}

pub async fn add_contact_handler(State(state): State<AppState>,
                                 CurrentAccount(account): CurrentAccount,
                                 payload: Result<Json<NewContact>, JsonRejection>)
                                 -> AppResult<(StatusCode, Json<Contact>)> {
    let Json(contact) = payload?;
    let row = state.run(move |engine| engine.add_contact(account.id, &contact)).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Deserialize)]
pub struct UpdateContact {
    pub id: i64,
    #[serde(flatten)]
    pub patch: ContactPatch,
}

pub async fn update_contact_handler(State(state): State<AppState>,
                                    CurrentAccount(account): CurrentAccount,
                                    payload: Result<Json<UpdateContact>, JsonRejection>)
                                    -> AppResult<Json<Contact>> {
    let Json(body) = payload?;
    let row = state.run(move |engine| engine.update_contact(account.id, body.id, &body.patch))
                   .await?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct DeleteContact {
    pub id: i64,
}

pub async fn delete_contact_handler(State(state): State<AppState>,
                                    CurrentAccount(account): CurrentAccount,
                                    payload: Result<Json<DeleteContact>, JsonRejection>)
                                    -> AppResult<Json<Value>> {
    let Json(body) = payload?;
    state.run(move |engine| engine.delete_contact(account.id, body.id)).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub async fn activity_handler(State(state): State<AppState>,
                              CurrentAccount(account): CurrentAccount)
                              -> AppResult<Json<Vec<Activity>>> {
    let entries = state.run(move |engine| engine.recent_activity(account.id)).await?;
    Ok(Json(entries))
}
