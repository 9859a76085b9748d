use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppError, AppResult};

pub const USER_ID: &str = "user_id";
pub const RETURN_URL: &str = "return_url";
pub const RECOVERY_USER_ID: &str = "recovery_user_id";
pub const NOTICE: &str = "notice";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// One inline message for the next rendered page, with an optional link to show alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub link: Option<String>,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, text: text.into(), link: None }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into(), link: None }
    }

    pub fn with_link(mut self, link: String) -> Self {
        self.link = Some(link);
        self
    }
}

impl From<AppError> for Notice {
    fn from(err: AppError) -> Self {
        Notice::error(err.message())
    }
}

pub async fn user_id(session: &Session) -> AppResult<Option<Uuid>> {
    Ok(session.get::<Uuid>(USER_ID).await?)
}

pub async fn require_user(session: &Session) -> AppResult<Uuid> {
    user_id(session).await?.ok_or(AppError::Unauthenticated)
}

pub async fn sign_in(session: &Session, user_id: Uuid) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, user_id).await?;
    Ok(())
}

pub async fn flash(session: &Session, notice: Notice) -> AppResult<()> {
    session.insert(NOTICE, notice).await?;
    Ok(())
}

pub async fn take_notice(session: &Session) -> AppResult<Option<Notice>> {
    Ok(session.remove::<Notice>(NOTICE).await?)
}

/// Only same-site paths are honoured as post-login destinations.
pub fn safe_return_url(return_url: Option<String>) -> Option<String> {
    return_url.filter(|url| url.starts_with('/') && !url.starts_with("//"))
}
