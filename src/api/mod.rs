pub mod auth;
mod bookings;
mod clients;
pub mod error;
mod extractors;
mod galleries;
mod mahasiswa;
mod photographers;
pub mod transactions;
pub mod validation;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::CorsConfig;
use crate::startup::{get_system_health, SystemHealthStatus};
use crate::AppState;

use error::ApiError;

/// Request bodies, profile photos included, may not exceed this
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth
    let api_routes = Router::new()
        .route("/", get(welcome))
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/logout", post(auth::logout))
        .route("/users/me", get(auth::me))
        // Clients
        .route("/clients", get(clients::list_clients).post(clients::create_client))
        .route("/clients/user/:user_id", get(clients::get_client_by_user))
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        // Photographers
        .route(
            "/photographers",
            get(photographers::list_photographers).post(photographers::create_photographer),
        )
        .route(
            "/photographers/user/:user_id",
            get(photographers::get_photographer_by_user),
        )
        .route(
            "/photographers/:id",
            get(photographers::get_photographer)
                .put(photographers::update_photographer)
                .delete(photographers::delete_photographer),
        )
        // Bookings
        .route("/bookings", get(bookings::list_bookings).post(bookings::create_booking))
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        // Galleries
        .route("/galleries", get(galleries::list_galleries).post(galleries::create_gallery))
        .route(
            "/galleries/:id",
            get(galleries::get_gallery)
                .put(galleries::update_gallery)
                .delete(galleries::delete_gallery),
        )
        // Transactions
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route("/transactions/:id", get(transactions::get_transaction))
        // Student registry
        .route(
            "/mahasiswa",
            get(mahasiswa::list_mahasiswa).post(mahasiswa::create_mahasiswa),
        )
        .route(
            "/mahasiswa/:npm",
            get(mahasiswa::get_mahasiswa)
                .put(mahasiswa::update_mahasiswa)
                .delete(mahasiswa::delete_mahasiswa),
        );

    let uploads = ServeDir::new(&state.config.server.upload_dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Allow-listed origins with credentials; trailing slashes are ignored
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
}

/// Run a store call under the configured per-call timeout
pub(crate) async fn timed<T, E, F>(state: &AppState, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, E>>,
    ApiError: From<E>,
{
    match tokio::time::timeout(state.config.database.query_timeout(), fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            tracing::error!(
                timeout_secs = state.config.database.query_timeout_secs,
                "Database operation timed out"
            );
            Err(ApiError::database("Database operation timed out"))
        }
    }
}

/// Reject malformed identifiers before they reach the store
pub(crate) fn check_id(id: &str, field: &str) -> Result<(), ApiError> {
    validation::validate_uuid(id, field).map_err(|e| ApiError::validation_field(field, e))
}

async fn welcome() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Fotografi API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SystemHealthStatus>) {
    let health = get_system_health(&state.config, &state.db).await;
    let status = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}
