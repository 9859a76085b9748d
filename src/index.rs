use axum::{debug_handler, response::{IntoResponse, Redirect, Response}};
use tower_sessions::Session;

use crate::{session, AppResult};

/// Session gate: signed-in visitors go to their dashboard, everyone else to the login screen.
#[debug_handler]
pub async fn index(
    session: Session
) -> AppResult<Response> {
    let target = if session::user_id(&session).await?.is_some() {
        "/dashboard"
    } else {
        "/login"
    };

    Ok(Redirect::to(target).into_response())
}
