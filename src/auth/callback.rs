use axum::{
    debug_handler,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    session::{self, Notice, RECOVERY_USER_ID},
    AppResult, AppState,
};

use super::{
    identity::{self, TokenKind},
    login,
};

#[derive(Deserialize)]
pub(crate) struct CallbackQuery {
    #[serde(rename = "type")]
    kind: Option<TokenKind>,
    token: Option<String>,
}

/// Landing page for mailed links. Without a token it behaves like the session gate.
#[debug_handler(state = AppState)]
pub(crate) async fn callback(
    Query(CallbackQuery { kind, token }): Query<CallbackQuery>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let (Some(kind), Some(token)) = (kind, token) else {
        return crate::index::index(session).await;
    };

    let outcome = match kind {
        TokenKind::Signup => match identity::confirm_email(&db_pool, &token).await {
            Ok(user) => {
                session::flash(&session, Notice::success("Email confirmed.")).await?;
                return login::enter(&session, user.id).await;
            }
            Err(e) => e,
        },
        TokenKind::Recovery => match identity::begin_recovery(&db_pool, &token).await {
            Ok(user_id) => {
                session.insert(RECOVERY_USER_ID, user_id).await?;
                return Ok(Redirect::to("/auth/reset-password").into_response());
            }
            Err(e) => e,
        },
    };

    session::flash(&session, outcome.into()).await?;
    Ok(Redirect::to("/login").into_response())
}
