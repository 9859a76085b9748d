mod callback;
pub mod identity;
mod login;
mod logout;
pub mod mailer;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use mailer::{LogMailer, Mail, Mailer, MemoryMailer};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/signup", post(login::signup))
        .route("/login/resend", post(login::resend))
        .route("/login/reset", post(login::reset))
        .route("/auth/callback", get(callback::callback))
        .route(
            "/auth/reset-password",
            get(login::reset_password_page).post(login::reset_password),
        )
        .route("/logout", get(logout::logout).post(logout::logout))
}
