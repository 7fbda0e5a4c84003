//! Rutas HTTP sobre el backend en memoria.

mod support;

use axum::http::StatusCode;
use f0_gate::KvStore;
use serde_json::json;
use support::{admin_get, admin_post, enroll, get, memory_app, memory_state, post, send, signup, ADMIN_KEY};

#[tokio::test]
async fn health_reports_store() {
    let (_, app) = memory_app();
    let reply = send(&app, get("/health", None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["service"], "fortune0");
    assert_eq!(reply.body["store"], "memory");
}

#[tokio::test]
async fn dashboard_scenario_over_http() {
    let (_, app) = memory_app();
    let (token_a, code_a) = signup(&app, "a@example.com", None).await;

    let stats = send(&app, get("/api/stats", Some(&token_a))).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["clicks"], 0);
    assert_eq!(stats.body["conversion_rate"], 0.0);
    assert_eq!(stats.body["current_rate"], 0.05);

    for _ in 0..3 {
        let visit = send(&app, get(&format!("/r/{code_a}"), None)).await;
        assert_eq!(visit.status, StatusCode::FOUND);
        assert_eq!(visit.location, Some(format!("/join?ref={code_a}")));
    }
    signup(&app, "b@example.com", Some(&code_a)).await;

    let me = send(&app, get("/api/me", Some(&token_a))).await;
    let account_id = me.body["id"].as_i64().unwrap();

    let first = send(&app,
                     admin_post("/api/commissions", ADMIN_KEY, json!({ "account_id": account_id, "amount": 12000.0 }))).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["rate"], 0.05);
    assert_eq!(first.body["commission"], 600.0);

    let second = send(&app,
                      admin_post("/api/commissions", ADMIN_KEY, json!({ "referral_code": code_a, "amount": 5000 }))).await;
    assert_eq!(second.status, StatusCode::CREATED);
    assert_eq!(second.body["rate"], 0.04);
    assert_eq!(second.body["commission"], 200.0);

    let stats = send(&app, get("/api/stats", Some(&token_a))).await;
    assert_eq!(stats.body["clicks"], 3);
    assert_eq!(stats.body["signups"], 1);
    assert_eq!(stats.body["conversions"], 1);
    assert_eq!(stats.body["conversion_rate"], 33.3);
    assert_eq!(stats.body["total_revenue"], 17000.0);
    assert_eq!(stats.body["total_commission"], 800.0);
    assert_eq!(stats.body["current_rate"], 0.04);
    assert_eq!(stats.body["next_tier_at"], 50000.0);

    let statement = send(&app, get("/api/commissions", Some(&token_a))).await;
    let rates: Vec<f64> = statement.body
                                   .as_array()
                                   .unwrap()
                                   .iter()
                                   .map(|e| e["rate"].as_f64().unwrap())
                                   .collect();
    assert_eq!(rates, vec![0.05, 0.04]);

    let referrals = send(&app, get("/api/referrals", Some(&token_a))).await;
    assert_eq!(referrals.body[0]["email"], "b@example.com");
}

#[tokio::test]
async fn unknown_and_empty_codes_still_redirect() {
    let (state, app) = memory_app();
    let visit = send(&app, get("/r/IK-NOPE0000", None)).await;
    assert_eq!(visit.status, StatusCode::FOUND);
    assert_eq!(visit.location.as_deref(), Some("/join"));
    assert_eq!(state.engine.click_count("IK-NOPE0000").unwrap(), 1);

    let empty = send(&app, get("/r/", None)).await;
    assert_eq!(empty.status, StatusCode::FOUND);
    assert_eq!(empty.location.as_deref(), Some("/"));
}

#[tokio::test]
async fn codes_with_slashes_or_only_spaces_are_recorded() {
    let (state, app) = memory_app();
    let nested = send(&app, get("/r/IK-AB/CD", None)).await;
    assert_eq!(nested.status, StatusCode::FOUND);
    assert_eq!(nested.location.as_deref(), Some("/join"));
    assert_eq!(state.engine.click_count("IK-AB/CD").unwrap(), 1);

    let blank = send(&app, get("/r/%20%20", None)).await;
    assert_eq!(blank.status, StatusCode::FOUND);
    assert_eq!(blank.location.as_deref(), Some("/"));
    assert_eq!(state.engine.click_count("  ").unwrap(), 1);
}

#[tokio::test]
async fn authenticated_routes_reject_missing_or_bad_tokens() {
    let (_, app) = memory_app();
    for uri in ["/api/stats", "/api/me", "/api/commissions", "/api/contacts", "/api/activity"] {
        assert_eq!(send(&app, get(uri, None)).await.status, StatusCode::UNAUTHORIZED, "{uri}");
        let bad = send(&app, get(uri, Some("deadbeef"))).await;
        assert_eq!(bad.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(bad.body["code"], "INVALID_TOKEN");
    }
}

#[tokio::test]
async fn signup_and_login_errors() {
    let (_, app) = memory_app();
    signup(&app, "dup@example.com", None).await;

    let dup = send(&app, post("/api/signup", None, json!({ "email": "DUP@example.com" }))).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);
    assert_eq!(dup.body["code"], "DUPLICATE_EMAIL");

    let invalid = send(&app, post("/api/signup", None, json!({ "email": "nope" }))).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let malformed = send(&app, post("/api/signup", None, json!({ "mail": "x@y.z" }))).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let unknown = send(&app, post("/api/login", None, json!({ "email": "ghost@example.com", "key": "IK-x" }))).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_requires_the_license_key_from_signup() {
    let (_, app) = memory_app();
    let alice = enroll(&app, "alice@example.com", None).await;
    let bob = enroll(&app, "bob@example.com", None).await;
    let key = alice["license_key"].as_str().unwrap();
    assert!(key.starts_with("IK-"));

    let bare = send(&app, post("/api/login", None, json!({ "email": "alice@example.com" }))).await;
    assert_eq!(bare.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bare.body["code"], "INVALID_LICENSE_KEY");
    let borrowed = send(&app,
                        post("/api/login", None, json!({ "email": "alice@example.com", "key": bob["license_key"] }))).await;
    assert_eq!(borrowed.status, StatusCode::UNAUTHORIZED);

    let login = send(&app, post("/api/login", None, json!({ "email": "Alice@example.com", "key": key }))).await;
    assert_eq!(login.status, StatusCode::OK);
    assert!(login.body.get("license_key").is_none());
    let token = login.body["token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    let me = send(&app, get("/api/me", Some(token))).await;
    assert_eq!(me.body["email"], "alice@example.com");
}

#[tokio::test]
async fn commission_ingestion_is_guarded_and_validated() {
    let (_, app) = memory_app();
    let (_, code) = signup(&app, "a@example.com", None).await;

    let no_key = send(&app, post("/api/commissions", None, json!({ "referral_code": code, "amount": 10 }))).await;
    assert_eq!(no_key.status, StatusCode::FORBIDDEN);
    let wrong_key = send(&app, admin_post("/api/commissions", "nope", json!({ "referral_code": code, "amount": 10 }))).await;
    assert_eq!(wrong_key.status, StatusCode::FORBIDDEN);

    let negative = send(&app, admin_post("/api/commissions", ADMIN_KEY, json!({ "referral_code": code, "amount": -5 }))).await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
    assert_eq!(negative.body["code"], "INVALID_AMOUNT");

    let unknown = send(&app, admin_post("/api/commissions", ADMIN_KEY, json!({ "account_id": 999, "amount": 5 }))).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let missing = send(&app, admin_post("/api/commissions", ADMIN_KEY, json!({ "amount": 5 }))).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let body = json!({ "referral_code": code, "amount": 40, "order_id": "ORD-77" });
    assert_eq!(send(&app, admin_post("/api/commissions", ADMIN_KEY, body.clone())).await.status,
               StatusCode::CREATED);
    let again = send(&app, admin_post("/api/commissions", ADMIN_KEY, body)).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["code"], "DUPLICATE_ORDER");
}

#[tokio::test]
async fn ingestion_is_disabled_without_admin_key() {
    let app = fortune0::build_app(memory_state(None));
    let reply = send(&app, admin_post("/api/commissions", "anything", json!({ "account_id": 1, "amount": 5 }))).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn order_webhook_attributes_by_discount_code() {
    let (_, app) = memory_app();
    let (token, code) = signup(&app, "a@example.com", None).await;
    let reply = send(&app,
                     admin_post("/api/webhooks/order",
                                ADMIN_KEY,
                                json!({ "discount_code": code, "order_total": 200.0, "order_id": "SHOP-1" }))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["attributed"], true);
    assert_eq!(reply.body["commission"]["commission"], 10.0);

    let unknown = send(&app,
                       admin_post("/api/webhooks/order",
                                  ADMIN_KEY,
                                  json!({ "discount_code": "IK-NOPE0000", "order_total": 10.0 }))).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let feed = send(&app, get("/api/activity", Some(&token))).await;
    assert_eq!(feed.body[0]["action"], "commission");
    assert_eq!(feed.body[0]["detail"], "$10.00 from order SHOP-1");
}

#[tokio::test]
async fn join_is_idempotent() {
    let (_, app) = memory_app();
    let first = send(&app, post("/api/join", None, json!({ "email": "aff@example.com" }))).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["returning"], false);
    let code = first.body["referral_code"].as_str().unwrap().to_string();
    assert_eq!(first.body["short_url"], format!("/r/{code}"));

    send(&app, get(&format!("/r/{code}"), None)).await;

    let again = send(&app, post("/api/join", None, json!({ "email": "AFF@example.com" }))).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["returning"], true);
    assert_eq!(again.body["referral_code"], code.as_str());
    assert_eq!(again.body["clicks"], 1);
    // Sólo el alta entrega credenciales.
    assert!(first.body["token"].is_string());
    assert!(first.body["license_key"].is_string());
    assert!(again.body.get("token").is_none());
    assert!(again.body.get("license_key").is_none());
}

#[tokio::test]
async fn public_affiliate_stats() {
    let (_, app) = memory_app();
    let (_, code) = signup(&app, "a@example.com", None).await;
    send(&app, get(&format!("/r/{code}"), None)).await;

    let empty = send(&app, get("/api/affiliate/stats?code=", None)).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    let missing = send(&app, get("/api/affiliate/stats", None)).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    let unknown = send(&app, get("/api/affiliate/stats?code=IK-NOPE0000", None)).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let known = send(&app, get(&format!("/api/affiliate/stats?code={code}"), None)).await;
    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.body["clicks"], 1);
    assert_eq!(known.body["share_url"], format!("http://localhost/r/{code}"));
}

#[tokio::test]
async fn contacts_crud_and_activity() {
    let (_, app) = memory_app();
    let (token, _) = signup(&app, "crm@example.com", None).await;
    let (other, _) = signup(&app, "other@example.com", None).await;

    let created = send(&app,
                       post("/api/contacts", Some(&token), json!({ "name": "Ada", "company": "Analytical" }))).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();

    let blank = send(&app, post("/api/contacts", Some(&token), json!({ "name": " " }))).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let found = send(&app, get("/api/contacts?q=analyt", Some(&token))).await;
    assert_eq!(found.body.as_array().unwrap().len(), 1);
    let hidden = send(&app, get("/api/contacts", Some(&other))).await;
    assert!(hidden.body.as_array().unwrap().is_empty());

    let updated = send(&app,
                       post("/api/contacts/update", Some(&token), json!({ "id": id, "phone": "555-0100" }))).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["phone"], "555-0100");
    assert_eq!(updated.body["name"], "Ada");

    let foreign = send(&app, post("/api/contacts/delete", Some(&other), json!({ "id": id }))).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    let deleted = send(&app, post("/api/contacts/delete", Some(&token), json!({ "id": id }))).await;
    assert_eq!(deleted.body["deleted"], true);

    let feed = send(&app, get("/api/activity", Some(&token))).await;
    let actions: Vec<&str> = feed.body
                                 .as_array()
                                 .unwrap()
                                 .iter()
                                 .map(|e| e["action"].as_str().unwrap())
                                 .collect();
    assert_eq!(actions, vec!["contact_deleted", "contact_updated", "contact_added", "signup"]);
}

#[tokio::test]
async fn gate_dispatches_closed_actions() {
    let (_, app) = memory_app();
    let unknown = send(&app, post("/api/gate", None, json!({ "action": "drop_all" }))).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let search = json!({ "action": "search", "email": "g@example.com", "query": "grants" });
    for remaining in [2, 1, 0] {
        let reply = send(&app, post("/api/gate", None, search.clone())).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({ "allowed": true, "remaining_free": remaining }));
    }
    let denied = send(&app, post("/api/gate", None, search)).await;
    assert_eq!(denied.body, json!({ "allowed": false, "remaining_free": 0 }));

    let sync = send(&app,
                    post("/api/gate", None, json!({ "action": "sync_subscriber", "email": "g@example.com", "plan": "pro" }))).await;
    assert_eq!(sync.body["synced"], true);
    let access = send(&app, post("/api/gate", None, json!({ "action": "check_access", "email": "g@example.com" }))).await;
    assert_eq!(access.body, json!({ "access": true, "plan": "pro", "remaining_free": null }));

    let bad_email = send(&app, post("/api/gate", None, json!({ "action": "check_access", "email": "nope" }))).await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn form_submissions_are_readable_by_admins() {
    let (_, app) = memory_app();
    let submit = json!({ "action": "submit_form", "email": "lead@example.com", "form": "demo", "fields": { "seats": 4 } });
    let submitted = send(&app, post("/api/gate", None, submit)).await;
    assert_eq!(submitted.body["ok"], true);

    let anonymous = send(&app, get("/api/gate/forms/demo", None)).await;
    assert_eq!(anonymous.status, StatusCode::FORBIDDEN);

    let listed = send(&app, admin_get("/api/gate/forms/demo", ADMIN_KEY)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body[0]["id"], submitted.body["id"]);
    assert_eq!(listed.body[0]["email"], "lead@example.com");
    assert_eq!(listed.body[0]["fields"]["seats"], 4);
}

#[tokio::test]
async fn gate_purge_task_drops_expired_keys() {
    let mut config = fortune0::AppConfig::in_memory(None);
    config.purge_interval = std::time::Duration::from_millis(10);
    let state = fortune0::AppState::with_store(config, std::sync::Arc::new(f0_core::InMemoryLedgerStore::new()));
    let written = chrono::Utc::now();
    state.gate.kv().put("search:x", "{}".into(), Some(chrono::Duration::milliseconds(1)), written).unwrap();
    state.gate.kv().put("sub:keep@example.com", "{}".into(), None, written).unwrap();

    let task = state.spawn_gate_purge();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    task.abort();
    // Leído con el reloj de la escritura: sólo sobrevive la clave sin TTL.
    assert_eq!(state.gate.kv().keys_with_prefix("", written).unwrap(), vec!["sub:keep@example.com".to_string()]);
}
