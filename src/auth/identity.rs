//! Email/password accounts, email confirmation and password recovery.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use anyhow::anyhow;
use serde::Deserialize;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{config::Config, db::User, random_token, AppError, AppResult};

use super::mailer::{Mail, Mailer};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const EMAIL_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Signup,
    Recovery,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Signup => "signup",
            TokenKind::Recovery => "recovery",
        }
    }
}

#[derive(Debug)]
pub enum SignUp {
    PendingConfirmation,
    Active(User),
}

pub fn clean_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn require_email(email: &str) -> AppResult<()> {
    if email.is_empty() {
        return Err(AppError::invalid("Enter your email first."));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    require_email(email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) => {
            Ok(())
        }
        _ => Err(AppError::invalid("Unable to validate email address: invalid format")),
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::invalid(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow!("hashing password: {e}"))
    })
    .await??;

    Ok(hash)
}

async fn verify_password(password_hash: &str, password: &str) -> AppResult<bool> {
    let password_hash = password_hash.to_owned();
    let password = password.to_owned();
    let matches = tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash).map_err(|e| anyhow!("stored password hash: {e}"))?;
        Ok::<_, anyhow::Error>(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await??;

    Ok(matches)
}

pub async fn find_user(db_pool: &SqlitePool, user_id: Uuid) -> AppResult<Option<User>> {
    Ok(sqlx::query_as("SELECT id,email,password_hash,email_confirmed_at,created_at FROM users WHERE id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn find_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    Ok(sqlx::query_as("SELECT id,email,password_hash,email_confirmed_at,created_at FROM users WHERE email=?")
        .bind(clean_email(email))
        .fetch_optional(db_pool)
        .await?)
}

async fn issue_token(db_pool: &SqlitePool, user_id: Uuid, kind: TokenKind) -> AppResult<String> {
    let token = random_token();
    sqlx::query("INSERT INTO email_tokens (token,user_id,kind,expires_at) VALUES (?,?,?,?)")
        .bind(&token)
        .bind(user_id)
        .bind(kind)
        .bind(OffsetDateTime::now_utc() + Duration::hours(EMAIL_TOKEN_TTL_HOURS))
        .execute(db_pool)
        .await?;
    Ok(token)
}

/// Marks a token used and returns its user. Unknown, expired, reused or
/// wrong-kind tokens all fail the same way.
async fn consume_token(db_pool: &SqlitePool, token: &str, kind: TokenKind) -> AppResult<Uuid> {
    let invalid = || AppError::invalid("Email link is invalid or has expired.");

    let row: Option<(Uuid, OffsetDateTime, Option<OffsetDateTime>)> =
        sqlx::query_as("SELECT user_id,expires_at,used_at FROM email_tokens WHERE token=? AND kind=?")
            .bind(token)
            .bind(kind)
            .fetch_optional(db_pool)
            .await?;
    let Some((user_id, expires_at, None)) = row else {
        return Err(invalid());
    };
    let now = OffsetDateTime::now_utc();
    if expires_at <= now {
        return Err(invalid());
    }

    let claimed = sqlx::query("UPDATE email_tokens SET used_at=? WHERE token=? AND used_at IS NULL")
        .bind(now)
        .bind(token)
        .execute(db_pool)
        .await?;
    if claimed.rows_affected() == 0 {
        return Err(invalid());
    }

    Ok(user_id)
}

fn mail_link(mailer: &dyn Mailer, config: &Config, to: &str, kind: TokenKind, token: &str) -> AppResult<()> {
    let subject = match kind {
        TokenKind::Signup => "Confirm your email",
        TokenKind::Recovery => "Reset your password",
    };
    mailer.send(Mail {
        to: to.to_owned(),
        subject: subject.to_owned(),
        link: config.link(&format!("/auth/callback?type={}&token={token}", kind.as_str())),
    })
}

pub async fn sign_up(
    db_pool: &SqlitePool,
    config: &Config,
    mailer: &dyn Mailer,
    email: &str,
    password: &str,
) -> AppResult<SignUp> {
    let email = clean_email(email);
    validate_email(&email)?;
    validate_password(password)?;

    let password_hash = hash_password(password).await?;
    let now = OffsetDateTime::now_utc();
    let confirmed_at = (!config.require_email_confirmation).then_some(now);
    let user_id = Uuid::now_v7();

    let inserted = sqlx::query("INSERT INTO users (id,email,password_hash,email_confirmed_at,created_at) VALUES (?,?,?,?,?)")
        .bind(user_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(confirmed_at)
        .bind(now)
        .execute(db_pool)
        .await;
    match inserted {
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict("User already registered".to_owned()));
        }
        other => {
            other?;
        }
    }
    info!("user {user_id} signed up");

    if config.require_email_confirmation {
        let token = issue_token(db_pool, user_id, TokenKind::Signup).await?;
        mail_link(mailer, config, &email, TokenKind::Signup, &token)?;
        return Ok(SignUp::PendingConfirmation);
    }

    let user = find_user(db_pool, user_id).await?.ok_or("user vanished after sign-up")?;
    Ok(SignUp::Active(user))
}

pub async fn sign_in(db_pool: &SqlitePool, email: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::invalid("Invalid login credentials");

    let email = clean_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(invalid());
    }

    let Some(user) = find_by_email(db_pool, &email).await? else {
        return Err(invalid());
    };
    if !verify_password(&user.password_hash, password).await? {
        warn!("failed sign-in for {}", user.id);
        return Err(invalid());
    }
    if user.email_confirmed_at.is_none() {
        return Err(AppError::invalid("Email not confirmed"));
    }

    info!("user {} signed in", user.id);
    Ok(user)
}

/// Mails a fresh confirmation link if the address belongs to an unconfirmed
/// account. Succeeds either way so addresses cannot be probed.
pub async fn resend_confirmation(
    db_pool: &SqlitePool,
    config: &Config,
    mailer: &dyn Mailer,
    email: &str,
) -> AppResult<()> {
    let email = clean_email(email);
    require_email(&email)?;

    if let Some(user) = find_by_email(db_pool, &email).await? {
        if user.email_confirmed_at.is_none() {
            let token = issue_token(db_pool, user.id, TokenKind::Signup).await?;
            mail_link(mailer, config, &email, TokenKind::Signup, &token)?;
        }
    }
    Ok(())
}

/// Mails a recovery link if the address has an account. Succeeds either way.
pub async fn request_password_reset(
    db_pool: &SqlitePool,
    config: &Config,
    mailer: &dyn Mailer,
    email: &str,
) -> AppResult<()> {
    let email = clean_email(email);
    require_email(&email)?;

    if let Some(user) = find_by_email(db_pool, &email).await? {
        let token = issue_token(db_pool, user.id, TokenKind::Recovery).await?;
        mail_link(mailer, config, &email, TokenKind::Recovery, &token)?;
    }
    Ok(())
}

pub async fn confirm_email(db_pool: &SqlitePool, token: &str) -> AppResult<User> {
    let user_id = consume_token(db_pool, token, TokenKind::Signup).await?;

    sqlx::query("UPDATE users SET email_confirmed_at=COALESCE(email_confirmed_at, ?) WHERE id=?")
        .bind(OffsetDateTime::now_utc())
        .bind(user_id)
        .execute(db_pool)
        .await?;
    info!("user {user_id} confirmed their email");

    find_user(db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::invalid("Email link is invalid or has expired."))
}

/// Spends a recovery token, returning the user allowed to pick a new password.
pub async fn begin_recovery(db_pool: &SqlitePool, token: &str) -> AppResult<Uuid> {
    consume_token(db_pool, token, TokenKind::Recovery).await
}

/// Sets a new password. Following a recovery link also proves the address, so the email counts as confirmed.
pub async fn reset_password(db_pool: &SqlitePool, user_id: Uuid, password: &str) -> AppResult<()> {
    validate_password(password)?;
    let password_hash = hash_password(password).await?;

    let updated = sqlx::query(
        "UPDATE users SET password_hash=?, email_confirmed_at=COALESCE(email_confirmed_at, ?) WHERE id=?",
    )
    .bind(&password_hash)
    .bind(OffsetDateTime::now_utc())
    .bind(user_id)
    .execute(db_pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_owned()));
    }

    info!("user {user_id} reset their password");
    Ok(())
}
