use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    auth::identity,
    config::Config,
    include_res,
    res::{self, escape},
    session::{self, Notice},
    AppResult, AppState,
};

use super::store;

#[debug_handler(state = AppState)]
pub async fn dashboard(
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };
    let Some(user) = identity::find_user(&db_pool, user_id).await? else {
        session.flush().await?;
        return Ok(crate::to_login());
    };
    let notice = session::take_notice(&session).await?;

    let rooms = store::list_rooms(&db_pool, user_id).await?;
    let mut room_items = String::new();
    for room in &rooms {
        let role = if room.owner_id == user_id { "Owner" } else { "Member" };
        room_items += &include_res!(str, "/pages/room_item.html")
            .replace("{id}", &room.id.to_string())
            .replace("{role}", role)
            .replace("{created}", &crate::short_date(room.created_at))
            .replace("{name}", &escape(&room.name));
    }
    if rooms.is_empty() {
        room_items = r#"<p class="muted">No rooms yet. Create one or join with a key.</p>"#.to_owned();
    }

    let body = include_res!(str, "/pages/dashboard.html")
        .replace("{room_items}", &room_items)
        .replace("{notice}", &res::notice_html(notice.as_ref()))
        .replace("{email}", &escape(&user.email));

    Ok(res::page("Dashboard", &body).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateRoomForm {
    name: String,
    #[serde(default)]
    access_key: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_room(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Form(CreateRoomForm { name, access_key }): Form<CreateRoomForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };

    let notice = match store::create_room(&db_pool, user_id, &name, Some(&access_key), &config.access_key_salt).await {
        Ok(created) => {
            Notice::success("Room created.").with_link(config.link(&format!("/invite/{}", created.invite_token)))
        }
        Err(e) => Notice::from(e),
    };
    session::flash(&session, notice).await?;

    Ok(Redirect::to("/dashboard").into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinRoomForm {
    access_key: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn join_room(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Form(JoinRoomForm { access_key }): Form<JoinRoomForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };

    match store::join_room_by_key(&db_pool, user_id, &access_key, &config.access_key_salt).await {
        Ok(room_id) => {
            session::flash(&session, Notice::success("Joined.")).await?;
            Ok(to_room(room_id))
        }
        Err(e) => {
            session::flash(&session, Notice::from(e)).await?;
            Ok(Redirect::to("/dashboard").into_response())
        }
    }
}

pub(crate) fn to_room(room_id: Uuid) -> Response {
    Redirect::to(&format!("/rooms/{room_id}")).into_response()
}
