use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    rooms::back_to_room,
    session::{self, Notice},
    AppError, AppResult,
};

use super::store;

#[derive(Debug, Deserialize)]
pub(crate) struct AddTaskForm {
    title: String,
    difficulty: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn add_task(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
    Form(AddTaskForm { title, difficulty }): Form<AddTaskForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };

    let outcome = async {
        let difficulty: i64 = difficulty
            .trim()
            .parse()
            .map_err(|_| AppError::invalid("Difficulty must be between 1 and 5."))?;
        store::add_task(&db_pool, user_id, room_id, &title, difficulty).await?;
        Ok::<_, AppError>(Notice::success("Task added."))
    }
    .await;

    back_to_room(&session, room_id, outcome).await
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn randomize(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(room_id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };

    let outcome = store::randomize_tasks(&db_pool, user_id, room_id)
        .await
        .map(|count| Notice::success(format!("Randomized assignments for {count} task(s).")));

    back_to_room(&session, room_id, outcome).await
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignForm {
    #[serde(default)]
    assignee: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn assign(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path((room_id, task_id)): Path<(Uuid, Uuid)>,
    Form(AssignForm { assignee }): Form<AssignForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };

    let outcome = async {
        let assignee = match assignee.trim() {
            "" => None,
            raw => Some(Uuid::parse_str(raw).map_err(|_| AppError::invalid("Pick a member to assign."))?),
        };
        store::assign_task(&db_pool, user_id, task_id, assignee).await?;
        Ok::<_, AppError>(Notice::success(if assignee.is_some() { "Assigned." } else { "Unassigned." }))
    }
    .await;

    back_to_room(&session, room_id, outcome).await
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoneForm {
    done: bool,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn set_done(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path((room_id, task_id)): Path<(Uuid, Uuid)>,
    Form(DoneForm { done }): Form<DoneForm>,
) -> AppResult<Response> {
    let Some(user_id) = session::user_id(&session).await? else {
        return Ok(crate::to_login());
    };

    match store::set_task_done(&db_pool, user_id, task_id, done).await {
        Ok(()) => Ok(Redirect::to(&format!("/rooms/{room_id}")).into_response()),
        Err(e) => back_to_room(&session, room_id, Err(e)).await,
    }
}
