//! Router y arranque del servidor.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::auth::ADMIN_KEY_HEADER;
use crate::config::CONFIG;
use crate::routes::{account, commission, crm, gate, health, referral};
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any)
                               .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                               .allow_headers([CONTENT_TYPE, AUTHORIZATION, HeaderName::from_static(ADMIN_KEY_HEADER)])
                               .max_age(Duration::from_secs(60 * 60));

    Router::new().route("/health", get(health::health_handler))
                 .route("/api/signup", post(account::signup_handler))
                 .route("/api/login", post(account::login_handler))
                 .route("/api/me", get(account::me_handler))
                 .route("/api/join", post(account::join_handler))
                 .route("/r", get(referral::empty_code_handler))
                 .route("/r/", get(referral::empty_code_handler))
                 .route("/r/{*code}", get(referral::redirect_handler))
                 .route("/api/stats", get(referral::stats_handler))
                 .route("/api/affiliate/stats", get(referral::affiliate_stats_handler))
                 .route("/api/referrals", get(referral::referrals_handler))
                 .route("/api/commissions",
                        get(commission::statement_handler).post(commission::record_commission_handler))
                 .route("/api/webhooks/order", post(commission::order_webhook_handler))
                 .route("/api/contacts",
                        get(crm::list_contacts_handler).post(crm::add_contact_handler))
                 .route("/api/contacts/update", post(crm::update_contact_handler))
                 .route("/api/contacts/delete", post(crm::delete_contact_handler))
                 .route("/api/activity", get(crm::activity_handler))
                 .route("/api/gate", post(gate::gate_handler))
                 .route("/api/gate/forms/{form}", get(gate::form_submissions_handler))
                 .layer(TraceLayer::new_for_http())
                 .layer(cors)
                 .with_state(state)
}

pub async fn start_server() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
         .init();

    info!("Initializing state...");
    let config = CONFIG.clone();
    let port = config.port;
    let store = config.store;
    let state = tokio::task::spawn_blocking(move || AppState::new(config)).await??;
    let purge = state.spawn_gate_purge();

    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address} (store={store})");

    axum::serve(listener,
                build_app(state).into_make_service_with_connect_info::<SocketAddr>()).with_graceful_shutdown(shutdown_signal())
                                                                                     .await?;

    purge.abort();
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
