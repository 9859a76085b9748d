pub mod api;
pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod index;
pub mod res;
pub mod rooms;
pub mod session;
pub mod tasks;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{HeaderValue, Method},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use rand::{distr::Alphanumeric, Rng};
use sqlx::SqlitePool;
use time::{macros::format_description, OffsetDateTime};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, Session, SessionManagerLayer};

pub use appresult::{ApiError, ApiResult, AppError, AppResult};
use auth::Mailer;
use config::Config;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self { db_pool, config: Arc::new(config), mailer }
    }
}

pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.session_inactivity_minutes,
        )));

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true);
    if let Ok(origin) = HeaderValue::from_str(&state.config.public_origin) {
        cors = cors.allow_origin(origin);
    }

    Router::new()
        .route("/", get(index::index))
        .route("/style.css", get(res::stylesheet))
        .route("/dashboard", get(rooms::dashboard))
        .route("/invite/{token}", get(rooms::accept_invite))
        .merge(auth::router())
        .nest("/rooms", rooms::router())
        .merge(api::router().layer(cors))
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub fn to_login() -> Response {
    Redirect::to("/login").into_response()
}

/// Sends the visitor to log in, returning to `return_url` afterwards.
pub async fn to_login_then(session: &Session, return_url: String) -> AppResult<Response> {
    session.insert(session::RETURN_URL, return_url).await?;
    Ok(to_login())
}

/// Random URL-safe token for invites and mailed links.
pub fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub fn short_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| at.date().to_string())
}
