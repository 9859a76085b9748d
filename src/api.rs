//! JSON surface: the session probe, the named room/task procedures under
//! `/rpc`, and read-only views under `/api`.

use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{FromRequest, FromRequestParts, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    auth::identity,
    config::Config,
    db::{Member, Room, Task},
    rooms::store::{self as rooms, CreatedRoom},
    session,
    tasks::store as tasks,
    ApiError, ApiResult, AppState,
};

/// `Json` whose rejections answer with a JSON error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejections answer with a JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(current_session))
        .route("/rpc/create_room", post(create_room))
        .route("/rpc/join_room_by_key", post(join_room_by_key))
        .route("/rpc/join_room_by_invite", post(join_room_by_invite))
        .route("/rpc/add_room_task", post(add_room_task))
        .route("/rpc/randomize_tasks", post(randomize_tasks))
        .route("/rpc/assign_task", post(assign_task))
        .route("/rpc/set_task_done", post(set_task_done))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/{room_id}", get(room))
        .route("/api/rooms/{room_id}/tasks", get(list_tasks))
        .route("/api/rooms/{room_id}/members", get(list_members))
}

#[debug_handler(state = AppState)]
async fn current_session(State(db_pool): State<SqlitePool>, session: Session) -> ApiResult<Value> {
    let user = match session::user_id(&session).await? {
        Some(user_id) => identity::find_user(&db_pool, user_id).await?,
        None => None,
    };
    Ok(Json(json!({ "user": user })))
}

#[derive(Deserialize)]
struct CreateRoomParams {
    room_name: String,
    #[serde(default)]
    access_key_plain: Option<String>,
}

#[derive(Serialize)]
struct CreatedRoomBody {
    #[serde(flatten)]
    created: CreatedRoom,
    invite_link: String,
}

#[debug_handler(state = AppState)]
async fn create_room(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    ApiJson(CreateRoomParams { room_name, access_key_plain }): ApiJson<CreateRoomParams>,
) -> ApiResult<CreatedRoomBody> {
    let user_id = session::require_user(&session).await?;
    let created = rooms::create_room(
        &db_pool,
        user_id,
        &room_name,
        access_key_plain.as_deref(),
        &config.access_key_salt,
    )
    .await?;
    let invite_link = config.link(&format!("/invite/{}", created.invite_token));

    Ok(Json(CreatedRoomBody { created, invite_link }))
}

#[derive(Deserialize)]
struct JoinByKeyParams {
    access_key_plain: String,
}

#[debug_handler(state = AppState)]
async fn join_room_by_key(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    ApiJson(JoinByKeyParams { access_key_plain }): ApiJson<JoinByKeyParams>,
) -> ApiResult<Uuid> {
    let user_id = session::require_user(&session).await?;
    let room_id = rooms::join_room_by_key(&db_pool, user_id, &access_key_plain, &config.access_key_salt).await?;
    Ok(Json(room_id))
}

#[derive(Deserialize)]
struct JoinByInviteParams {
    token: String,
}

#[debug_handler(state = AppState)]
async fn join_room_by_invite(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiJson(JoinByInviteParams { token }): ApiJson<JoinByInviteParams>,
) -> ApiResult<Uuid> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(rooms::join_room_by_invite(&db_pool, user_id, &token).await?))
}

#[derive(Deserialize)]
struct AddTaskParams {
    rid: Uuid,
    task_title: String,
    diff: i64,
}

#[debug_handler(state = AppState)]
async fn add_room_task(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiJson(AddTaskParams { rid, task_title, diff }): ApiJson<AddTaskParams>,
) -> ApiResult<Uuid> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(tasks::add_task(&db_pool, user_id, rid, &task_title, diff).await?))
}

#[derive(Deserialize)]
struct RandomizeParams {
    rid: Uuid,
}

#[debug_handler(state = AppState)]
async fn randomize_tasks(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiJson(RandomizeParams { rid }): ApiJson<RandomizeParams>,
) -> ApiResult<usize> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(tasks::randomize_tasks(&db_pool, user_id, rid).await?))
}

#[derive(Deserialize)]
struct AssignParams {
    tid: Uuid,
    assignee: Option<Uuid>,
}

#[debug_handler(state = AppState)]
async fn assign_task(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiJson(AssignParams { tid, assignee }): ApiJson<AssignParams>,
) -> ApiResult<Value> {
    let user_id = session::require_user(&session).await?;
    tasks::assign_task(&db_pool, user_id, tid, assignee).await?;
    Ok(Json(Value::Null))
}

#[derive(Deserialize)]
struct SetDoneParams {
    tid: Uuid,
    done: bool,
}

#[debug_handler(state = AppState)]
async fn set_task_done(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiJson(SetDoneParams { tid, done }): ApiJson<SetDoneParams>,
) -> ApiResult<Value> {
    let user_id = session::require_user(&session).await?;
    tasks::set_task_done(&db_pool, user_id, tid, done).await?;
    Ok(Json(Value::Null))
}

#[debug_handler(state = AppState)]
async fn list_rooms(State(db_pool): State<SqlitePool>, session: Session) -> ApiResult<Vec<Room>> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(rooms::list_rooms(&db_pool, user_id).await?))
}

#[debug_handler(state = AppState)]
async fn room(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiPath(room_id): ApiPath<Uuid>,
) -> ApiResult<Room> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(rooms::load_room(&db_pool, user_id, room_id).await?))
}

#[debug_handler(state = AppState)]
async fn list_tasks(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiPath(room_id): ApiPath<Uuid>,
) -> ApiResult<Vec<Task>> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(tasks::list_tasks(&db_pool, user_id, room_id).await?))
}

#[debug_handler(state = AppState)]
async fn list_members(
    State(db_pool): State<SqlitePool>,
    session: Session,
    ApiPath(room_id): ApiPath<Uuid>,
) -> ApiResult<Vec<Member>> {
    let user_id = session::require_user(&session).await?;
    Ok(Json(rooms::members(&db_pool, user_id, room_id).await?))
}
