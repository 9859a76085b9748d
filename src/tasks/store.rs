use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::Task,
    rooms::store::{membership, require_owner},
    AppError, AppResult,
};

use super::{
    plan::{plan_assignments, OpenTask},
    Difficulty,
};

const TASK_COLUMNS: &str = "SELECT t.id,t.room_id,t.title,t.difficulty,t.created_at,t.created_by,t.is_done,\
     a.assignee_id,u.email AS assignee_email,a.assigned_at \
     FROM room_tasks t \
     LEFT JOIN task_assignments a ON a.task_id=t.id \
     LEFT JOIN users u ON u.id=a.assignee_id";

pub fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".to_owned())
}

pub fn clean_title(raw: &str) -> AppResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::invalid("Task title is required."));
    }
    Ok(title.to_owned())
}

pub async fn add_task(
    db_pool: &SqlitePool,
    user_id: Uuid,
    room_id: Uuid,
    title: &str,
    difficulty: i64,
) -> AppResult<Uuid> {
    let title = clean_title(title)?;
    let difficulty = Difficulty::try_from(difficulty).map_err(|e| AppError::invalid(e.to_string()))?;
    membership(db_pool, user_id, room_id).await?;

    let task_id = Uuid::now_v7();
    sqlx::query("INSERT INTO room_tasks (id,room_id,title,difficulty,created_at,created_by) VALUES (?,?,?,?,?,?)")
        .bind(task_id)
        .bind(room_id)
        .bind(&title)
        .bind(i64::from(difficulty))
        .bind(OffsetDateTime::now_utc())
        .bind(user_id)
        .execute(db_pool)
        .await?;

    info!("task {task_id} '{title}' ({difficulty}) added to room {room_id}");
    Ok(task_id)
}

/// Tasks of a room, newest first, each with its assignment if any.
pub async fn list_tasks(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<Vec<Task>> {
    membership(db_pool, user_id, room_id).await?;

    Ok(sqlx::query_as(&format!("{TASK_COLUMNS} WHERE t.room_id=? ORDER BY t.rowid DESC"))
        .bind(room_id)
        .fetch_all(db_pool)
        .await?)
}

/// Looks a task up for a caller who must belong to its room.
pub async fn load_task(db_pool: &SqlitePool, user_id: Uuid, task_id: Uuid) -> AppResult<Task> {
    let task: Task = sqlx::query_as(&format!("{TASK_COLUMNS} WHERE t.id=?"))
        .bind(task_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(task_not_found)?;

    membership(db_pool, user_id, task.room_id)
        .await
        .map_err(|_| task_not_found())?;
    Ok(task)
}

/// Reassigns every open task of the room. Returns how many were assigned.
pub async fn randomize_tasks(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<usize> {
    require_owner(db_pool, user_id, room_id).await?;

    let mut tx = db_pool.begin().await?;
    let open: Vec<(Uuid, i64)> = sqlx::query_as("SELECT id,difficulty FROM room_tasks WHERE room_id=? AND NOT is_done")
        .bind(room_id)
        .fetch_all(&mut *tx)
        .await?;
    let open = open
        .into_iter()
        .map(|(id, difficulty)| {
            Difficulty::try_from(difficulty)
                .map(|difficulty| OpenTask { id, difficulty })
                .map_err(|e| AppError::from(anyhow::Error::from(e)))
        })
        .collect::<AppResult<Vec<_>>>()?;

    let members: Vec<(Uuid,)> = sqlx::query_as("SELECT user_id FROM room_members WHERE room_id=?")
        .bind(room_id)
        .fetch_all(&mut *tx)
        .await?;
    let members: Vec<Uuid> = members.into_iter().map(|(id,)| id).collect();

    let plan = plan_assignments(&open, &members, &mut rand::rng());

    let now = OffsetDateTime::now_utc();
    for assignment in &plan {
        upsert_assignment(&mut tx, assignment.task_id, Some(assignment.assignee_id), now).await?;
    }
    tx.commit().await?;

    info!("randomized {} task(s) in room {room_id} across {} member(s)", plan.len(), members.len());
    Ok(plan.len())
}

async fn upsert_assignment(
    conn: &mut sqlx::SqliteConnection,
    task_id: Uuid,
    assignee_id: Option<Uuid>,
    now: OffsetDateTime,
) -> AppResult<()> {
    let assigned_at = assignee_id.map(|_| now);
    sqlx::query(
        "INSERT INTO task_assignments (task_id,assignee_id,assigned_at) VALUES (?,?,?) \
         ON CONFLICT (task_id) DO UPDATE SET assignee_id=excluded.assignee_id, assigned_at=excluded.assigned_at",
    )
    .bind(task_id)
    .bind(assignee_id)
    .bind(assigned_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Owner-only manual assignment. `None` clears the assignment.
pub async fn assign_task(
    db_pool: &SqlitePool,
    user_id: Uuid,
    task_id: Uuid,
    assignee_id: Option<Uuid>,
) -> AppResult<()> {
    let task = load_task(db_pool, user_id, task_id).await?;
    require_owner(db_pool, user_id, task.room_id).await?;

    if let Some(assignee_id) = assignee_id {
        membership(db_pool, assignee_id, task.room_id)
            .await
            .map_err(|_| AppError::invalid("Assignee is not a member of this room."))?;
    }

    let mut conn = db_pool.acquire().await?;
    upsert_assignment(&mut conn, task_id, assignee_id, OffsetDateTime::now_utc()).await?;

    info!("task {task_id} assigned to {assignee_id:?}");
    Ok(())
}

pub async fn set_task_done(db_pool: &SqlitePool, user_id: Uuid, task_id: Uuid, done: bool) -> AppResult<()> {
    load_task(db_pool, user_id, task_id).await?;

    sqlx::query("UPDATE room_tasks SET is_done=? WHERE id=?")
        .bind(done)
        .bind(task_id)
        .execute(db_pool)
        .await?;
    Ok(())
}
