use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    config::Config,
    include_res,
    res,
    session::{self, Notice, RETURN_URL},
    AppResult, AppState,
};

use super::{
    identity::{self, SignUp},
    mailer::Mailer,
};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct CredentialsForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    session: Session,
) -> AppResult<Response> {
    if session::user_id(&session).await?.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    if let Some(return_url) = session::safe_return_url(return_url) {
        session.insert(RETURN_URL, return_url).await?;
    }

    let notice = session::take_notice(&session).await?;
    let body = include_res!(str, "/pages/login.html")
        .replace("{notice}", &res::notice_html(notice.as_ref()))
        .replace("{min_password}", &identity::MIN_PASSWORD_LEN.to_string());

    Ok(res::page("Log in", &body).into_response())
}

/// Signs the user in and sends them where they were headed, or to the dashboard.
pub(super) async fn enter(session: &Session, user_id: uuid::Uuid) -> AppResult<Response> {
    session::sign_in(session, user_id).await?;
    let return_url = session.remove::<String>(RETURN_URL).await?;

    Ok(Redirect::to(&return_url.unwrap_or_else(|| "/dashboard".to_owned())).into_response())
}

async fn back_to_login(session: &Session, notice: Notice) -> AppResult<Response> {
    session::flash(session, notice).await?;
    Ok(Redirect::to("/login").into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(CredentialsForm { email, password }): Form<CredentialsForm>,
) -> AppResult<Response> {
    match identity::sign_in(&db_pool, &email, &password).await {
        Ok(user) => enter(&session, user.id).await,
        Err(e) => back_to_login(&session, e.into()).await,
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(mailer): State<Arc<dyn Mailer>>,
    session: Session,
    Form(CredentialsForm { email, password }): Form<CredentialsForm>,
) -> AppResult<Response> {
    match identity::sign_up(&db_pool, &config, mailer.as_ref(), &email, &password).await {
        Ok(SignUp::Active(user)) => enter(&session, user.id).await,
        Ok(SignUp::PendingConfirmation) => {
            back_to_login(
                &session,
                Notice::success("Account created. Check your email to confirm, then come back and log in."),
            )
            .await
        }
        Err(e) => back_to_login(&session, e.into()).await,
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn resend(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(mailer): State<Arc<dyn Mailer>>,
    session: Session,
    Form(CredentialsForm { email, .. }): Form<CredentialsForm>,
) -> AppResult<Response> {
    let notice = match identity::resend_confirmation(&db_pool, &config, mailer.as_ref(), &email).await {
        Ok(()) => Notice::success("Confirmation email sent. Check your inbox/spam."),
        Err(e) => e.into(),
    };
    back_to_login(&session, notice).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn reset(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(mailer): State<Arc<dyn Mailer>>,
    session: Session,
    Form(CredentialsForm { email, .. }): Form<CredentialsForm>,
) -> AppResult<Response> {
    let notice = match identity::request_password_reset(&db_pool, &config, mailer.as_ref(), &email).await {
        Ok(()) => Notice::success("Password reset email sent. Check your inbox/spam."),
        Err(e) => e.into(),
    };
    back_to_login(&session, notice).await
}

#[derive(Deserialize)]
pub(crate) struct NewPasswordForm {
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn reset_password_page(session: Session) -> AppResult<Response> {
    if session.get::<uuid::Uuid>(session::RECOVERY_USER_ID).await?.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let notice = session::take_notice(&session).await?;
    let body = include_res!(str, "/pages/reset_password.html")
        .replace("{notice}", &res::notice_html(notice.as_ref()))
        .replace("{min_password}", &identity::MIN_PASSWORD_LEN.to_string());

    Ok(res::page("New password", &body).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn reset_password(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Form(NewPasswordForm { password }): Form<NewPasswordForm>,
) -> AppResult<Response> {
    let Some(user_id) = session.get::<uuid::Uuid>(session::RECOVERY_USER_ID).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    if let Err(e) = identity::reset_password(&db_pool, user_id, &password).await {
        session::flash(&session, e.into()).await?;
        return Ok(Redirect::to("/auth/reset-password").into_response());
    }

    session.remove::<uuid::Uuid>(session::RECOVERY_USER_ID).await?;
    session::sign_in(&session, user_id).await?;
    session::flash(&session, Notice::success("Password updated.")).await?;
    Ok(Redirect::to("/dashboard").into_response())
}
