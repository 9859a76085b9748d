use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{include_res, res, session, AppResult};

use super::{dashboard::to_room, store};

#[debug_handler(state = crate::AppState)]
pub async fn accept_invite(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(token): Path<String>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return crate::to_login_then(&session, format!("/invite/{token}")).await;
    };

    match store::join_room_by_invite(&db_pool, user_id, &token).await {
        Ok(room_id) => Ok(to_room(room_id)),
        Err(e) => {
            let status = e.status();
            let body = include_res!(str, "/pages/invite.html").replace("{message}", &res::escape(&e.message()));
            Ok((status, res::page("Invite", &body)).into_response())
        }
    }
}
