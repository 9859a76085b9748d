mod dashboard;
mod invite;
mod room;
pub mod store;

use axum::{
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    session::{self, Notice},
    AppResult, AppState,
};

pub use dashboard::dashboard;
pub use invite::accept_invite;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(dashboard::create_room))
        .route("/join", post(dashboard::join_room))
        .route("/{room_id}", get(room::room))
        .route("/{room_id}/invite/rotate", post(room::rotate_invite))
        .merge(crate::tasks::router())
}

/// Flashes the outcome of a room action and sends the browser back to the room.
pub(crate) async fn back_to_room(session: &Session, room_id: Uuid, outcome: AppResult<Notice>) -> AppResult<Response> {
    let notice = outcome.unwrap_or_else(Notice::from);
    session::flash(session, notice).await?;

    Ok(Redirect::to(&format!("/rooms/{room_id}")).into_response())
}
