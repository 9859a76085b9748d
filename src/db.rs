use std::str::FromStr;

use serde::Serialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    FromRow, SqlitePool,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{tasks::Difficulty, AppResult};

pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await?;
    migrate(&db_pool).await?;

    Ok(db_pool)
}

/// Single-connection in-memory database; every connection of a `:memory:` pool would see its own empty database.
pub async fn connect_in_memory() -> AppResult<SqlitePool> {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
        .await?;
    migrate(&db_pool).await?;

    Ok(db_pool)
}

pub async fn migrate(db_pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(db_pool).await?;
    Ok(())
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub email_confirmed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Member,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Member {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// A task joined with its (at most one) assignment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub room_id: Uuid,
    pub title: String,
    #[sqlx(try_from = "i64")]
    pub difficulty: Difficulty,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Uuid,
    pub is_done: bool,
    pub assignee_id: Option<Uuid>,
    pub assignee_email: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub assigned_at: Option<OffsetDateTime>,
}
