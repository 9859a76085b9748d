use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    auth::identity,
    config::Config,
    db::{Member, Task},
    include_res,
    res::{self, escape},
    session::{self, Notice},
    tasks::{self, Difficulty},
    AppError, AppResult, AppState,
};

use super::{back_to_room, store};

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return crate::to_login_then(&session, format!("/rooms/{room_id}")).await;
    };
    let Ok(room_id) = Uuid::parse_str(&room_id) else {
        return Ok(res::sorry("room"));
    };
    let Some(me) = identity::find_user(&db_pool, user_id).await? else {
        session.flush().await?;
        return Ok(crate::to_login());
    };

    let room = match store::load_room(&db_pool, user_id, room_id).await {
        Ok(room) => room,
        Err(AppError::NotFound(_)) => return Ok(res::sorry("room")),
        Err(e) => return Err(e),
    };
    let is_owner = room.owner_id == user_id;
    let notice = session::take_notice(&session).await?;

    let tasks = tasks::store::list_tasks(&db_pool, user_id, room_id).await?;
    let members = store::members(&db_pool, user_id, room_id).await?;

    let my_tasks: Vec<&Task> = tasks.iter().filter(|t| t.assignee_id == Some(user_id)).collect();
    let my_tasks_html = if my_tasks.is_empty() {
        r#"<p class="muted">Nothing assigned to you.</p>"#.to_owned()
    } else {
        my_tasks.iter().map(|t| task_html(t, room_id, is_owner, &members)).collect()
    };
    let tasks_html = if tasks.is_empty() {
        r#"<p class="muted">No chores yet.</p>"#.to_owned()
    } else {
        tasks.iter().map(|t| task_html(t, room_id, is_owner, &members)).collect()
    };

    let members_html: String = members
        .iter()
        .map(|m| {
            format!(
                r#"<li>{} <span class="pill">{}</span></li>"#,
                escape(&m.email),
                if m.user_id == room.owner_id { "Owner" } else { "Member" }
            )
        })
        .collect();

    let invite_html = match store::invite_token(&db_pool, user_id, room_id).await? {
        Some(token) => {
            let link = escape(&config.link(&format!("/invite/{token}")));
            format!(r#"<p>Invite link: <a class="mono" href="{link}">{link}</a></p>"#)
        }
        None => String::new(),
    };

    let admin_html = if is_owner {
        include_res!(str, "/pages/rooms/admin.html").replace("{room_id}", &room_id.to_string())
    } else {
        String::new()
    };

    let difficulty_options: String = Difficulty::all()
        .map(|d| {
            let selected = if d == Difficulty::default() { " selected" } else { "" };
            format!(r#"<option value="{d}"{selected}>{d} · {}</option>"#, d.label())
        })
        .collect();

    let body = include_res!(str, "/pages/rooms/room.html")
        .replace("{admin}", &admin_html)
        .replace("{invite}", &invite_html)
        .replace("{difficulty_options}", &difficulty_options)
        .replace("{my_tasks}", &my_tasks_html)
        .replace("{tasks}", &tasks_html)
        .replace("{members}", &members_html)
        .replace("{notice}", &res::notice_html(notice.as_ref()))
        .replace("{role}", if is_owner { "Admin" } else { "Member" })
        .replace("{room_id}", &room_id.to_string())
        .replace("{email}", &escape(&me.email))
        .replace("{room_name}", &escape(&room.name));

    Ok(res::page(&room.name, &body).into_response())
}

fn task_html(task: &Task, room_id: Uuid, is_owner: bool, members: &[Member]) -> String {
    let assignee = match (&task.assignee_email, task.assigned_at) {
        (Some(email), Some(at)) => format!("Assigned to {} · {}", escape(email), crate::short_date(at)),
        (Some(email), None) => format!("Assigned to {}", escape(email)),
        _ => "Unassigned".to_owned(),
    };

    let assign_form = if is_owner {
        let options: String = members
            .iter()
            .map(|m| {
                let selected = if Some(m.user_id) == task.assignee_id { " selected" } else { "" };
                format!(r#"<option value="{}"{selected}>{}</option>"#, m.user_id, escape(&m.email))
            })
            .collect();
        include_res!(str, "/pages/rooms/assign_form.html").replace("{options}", &options)
    } else {
        String::new()
    };

    include_res!(str, "/pages/rooms/task_item.html")
        .replace("{assign_form}", &assign_form)
        .replace("{done_class}", if task.is_done { " done" } else { "" })
        .replace("{done_value}", if task.is_done { "false" } else { "true" })
        .replace("{done_label}", if task.is_done { "Mark undone" } else { "Mark done" })
        .replace("{difficulty}", &task.difficulty.to_string())
        .replace("{label}", task.difficulty.label())
        .replace("{created}", &crate::short_date(task.created_at))
        .replace("{assignee}", &assignee)
        .replace("{room_id}", &room_id.to_string())
        .replace("{task_id}", &task.id.to_string())
        .replace("{title}", &escape(&task.title))
}

#[debug_handler(state = AppState)]
pub(crate) async fn rotate_invite(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };

    let outcome = store::rotate_invite(&db_pool, user_id, room_id)
        .await
        .map(|_| Notice::success("Invite link replaced. Old links no longer work."));

    back_to_room(&session, room_id, outcome).await
}
