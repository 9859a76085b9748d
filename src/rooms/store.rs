//! Room operations. Every read and write checks the caller's membership
//! first; a room the caller does not belong to is reported as not found.

use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use anyhow::anyhow;
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::{Member, Role, Room},
    random_token, AppError, AppResult,
};

#[derive(Debug, Clone, Serialize)]
pub struct CreatedRoom {
    pub room_id: Uuid,
    pub invite_token: String,
}

pub fn room_not_found() -> AppError {
    AppError::NotFound("Room not found".to_owned())
}

pub fn clean_room_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::invalid("Room name is required."));
    }
    Ok(name.to_owned())
}

/// Access keys are hashed with a deployment-wide salt so a key can be looked
/// up by its hash while only the hash is stored.
pub async fn hash_access_key(key: &str, salt: &str) -> AppResult<String> {
    let key = key.to_owned();
    let salt = SaltString::from_b64(salt).map_err(|e| anyhow!("bad ACCESS_KEY_SALT: {e}"))?;

    let hash = tokio::task::spawn_blocking(move || {
        Argon2::default()
            .hash_password(key.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("hashing access key: {e}"))
    })
    .await??;

    Ok(hash)
}

pub async fn create_room(
    db_pool: &SqlitePool,
    owner_id: Uuid,
    name: &str,
    access_key: Option<&str>,
    salt: &str,
) -> AppResult<CreatedRoom> {
    let name = clean_room_name(name)?;
    let access_key_hash = match access_key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => Some(hash_access_key(key, salt).await?),
        None => None,
    };

    let room_id = Uuid::now_v7();
    let invite_token = random_token();
    let now = OffsetDateTime::now_utc();

    let mut tx = db_pool.begin().await?;
    let inserted = sqlx::query("INSERT INTO rooms (id,name,owner_id,access_key_hash,created_at) VALUES (?,?,?,?,?)")
        .bind(room_id)
        .bind(&name)
        .bind(owner_id)
        .bind(&access_key_hash)
        .bind(now)
        .execute(&mut *tx)
        .await;
    match inserted {
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict("That access key is already used by another room.".to_owned()));
        }
        other => {
            other?;
        }
    }

    sqlx::query("INSERT INTO room_members (room_id,user_id,role,joined_at) VALUES (?,?,?,?)")
        .bind(room_id)
        .bind(owner_id)
        .bind(Role::Owner)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO room_invites (room_id,invite_token,created_at) VALUES (?,?,?)")
        .bind(room_id)
        .bind(&invite_token)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("room {room_id} '{name}' created by {owner_id}");
    Ok(CreatedRoom { room_id, invite_token })
}

async fn add_member(db_pool: &SqlitePool, room_id: Uuid, user_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("INSERT OR IGNORE INTO room_members (room_id,user_id,role,joined_at) VALUES (?,?,?,?)")
        .bind(room_id)
        .bind(user_id)
        .bind(Role::Member)
        .bind(OffsetDateTime::now_utc())
        .execute(db_pool)
        .await?;

    if result.rows_affected() > 0 {
        info!("{user_id} joined room {room_id}");
    } else {
        debug!("{user_id} already in room {room_id}");
    }
    Ok(())
}

pub async fn join_room_by_key(db_pool: &SqlitePool, user_id: Uuid, key: &str, salt: &str) -> AppResult<Uuid> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::invalid("Access key is required."));
    }

    let hash = hash_access_key(key, salt).await?;
    let Some((room_id,)): Option<(Uuid,)> = sqlx::query_as("SELECT id FROM rooms WHERE access_key_hash=?")
        .bind(&hash)
        .fetch_optional(db_pool)
        .await?
    else {
        return Err(AppError::NotFound("Invalid access key".to_owned()));
    };

    add_member(db_pool, room_id, user_id).await?;
    Ok(room_id)
}

pub async fn join_room_by_invite(db_pool: &SqlitePool, user_id: Uuid, token: &str) -> AppResult<Uuid> {
    let Some((room_id,)): Option<(Uuid,)> = sqlx::query_as("SELECT room_id FROM room_invites WHERE invite_token=?")
        .bind(token.trim())
        .fetch_optional(db_pool)
        .await?
    else {
        return Err(AppError::NotFound("Invalid or expired invite link".to_owned()));
    };

    add_member(db_pool, room_id, user_id).await?;
    Ok(room_id)
}

/// Rooms the user belongs to, newest first.
pub async fn list_rooms(db_pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<Room>> {
    Ok(sqlx::query_as(
        "SELECT r.id,r.name,r.owner_id,r.created_at FROM rooms r \
         JOIN room_members m ON m.room_id=r.id \
         WHERE m.user_id=? ORDER BY r.rowid DESC",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn membership(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<Role> {
    let role: Option<(Role,)> = sqlx::query_as("SELECT role FROM room_members WHERE room_id=? AND user_id=?")
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;

    role.map(|(role,)| role).ok_or_else(room_not_found)
}

pub async fn load_room(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<Room> {
    membership(db_pool, user_id, room_id).await?;

    sqlx::query_as("SELECT id,name,owner_id,created_at FROM rooms WHERE id=?")
        .bind(room_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(room_not_found)
}

/// Fails unless `user_id` is the room's owner.
pub async fn require_owner(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<Room> {
    let room = load_room(db_pool, user_id, room_id).await?;
    if room.owner_id != user_id {
        return Err(AppError::not_owner());
    }
    Ok(room)
}

pub async fn members(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<Vec<Member>> {
    membership(db_pool, user_id, room_id).await?;

    Ok(sqlx::query_as(
        "SELECT m.user_id,u.email,m.role FROM room_members m \
         JOIN users u ON u.id=m.user_id \
         WHERE m.room_id=? ORDER BY m.role='owner' DESC, m.rowid",
    )
    .bind(room_id)
    .fetch_all(db_pool)
    .await?)
}

pub async fn invite_token(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<Option<String>> {
    membership(db_pool, user_id, room_id).await?;

    let token: Option<(String,)> = sqlx::query_as("SELECT invite_token FROM room_invites WHERE room_id=?")
        .bind(room_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(token.map(|(token,)| token))
}

/// Replaces the room's invite token; links carrying the old one stop working.
pub async fn rotate_invite(db_pool: &SqlitePool, user_id: Uuid, room_id: Uuid) -> AppResult<String> {
    require_owner(db_pool, user_id, room_id).await?;

    let token = random_token();
    sqlx::query(
        "INSERT INTO room_invites (room_id,invite_token,created_at) VALUES (?,?,?) \
         ON CONFLICT (room_id) DO UPDATE SET invite_token=excluded.invite_token, created_at=excluded.created_at",
    )
    .bind(room_id)
    .bind(&token)
    .bind(OffsetDateTime::now_utc())
    .execute(db_pool)
    .await?;

    info!("invite for room {room_id} rotated");
    Ok(token)
}
