#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use choreroom::{app, auth::MemoryMailer, config::Config, db, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub mailer: Arc<MemoryMailer>,
    pub db_pool: SqlitePool,
}

impl TestApp {
    /// Accounts are active straight after sign-up.
    pub async fn new() -> Self {
        Self::with_config(Config { require_email_confirmation: false, ..Config::default() }).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db_pool = db::connect_in_memory().await.unwrap();
        let mailer = Arc::new(MemoryMailer::default());
        let router = app(AppState::new(db_pool.clone(), config, mailer.clone()));

        Self { router, mailer, db_pool }
    }

    pub fn client(&self) -> Client<'_> {
        Client { app: self, cookie: None }
    }

    /// A client signed in as a freshly registered user.
    pub async fn user(&self, email: &str) -> Client<'_> {
        let mut client = self.client();
        let res = client.post_form("/signup", &[("email", email), ("password", "hunter22")]).await;
        assert_eq!(location(&res), "/dashboard", "sign-up of {email} failed");
        client
    }
}

pub struct Client<'a> {
    app: &'a TestApp,
    cookie: Option<String>,
}

impl Client<'_> {
    async fn send(&mut self, mut req: Request<Body>) -> Response<Body> {
        if let Some(cookie) = &self.cookie {
            req.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());
        }

        let res = self.app.router.clone().oneshot(req).await.unwrap();

        if let Some(set_cookie) = res.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_owned();
            // A flushed session comes back as an empty `id=`.
            self.cookie = (!pair.ends_with('=')).then_some(pair);
        }
        res
    }

    pub async fn get(&mut self, path: &str) -> Response<Body> {
        self.send(Request::get(path).body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        self.send(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&mut self, path: &str, json: Value) -> Response<Body> {
        self.send(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
    }

    /// GETs a page and returns its HTML, asserting it rendered.
    pub async fn page(&mut self, path: &str) -> String {
        let res = self.get(path).await;
        assert_eq!(res.status(), StatusCode::OK, "GET {path}");
        text(res).await
    }

    pub async fn get_json(&mut self, path: &str) -> Value {
        let res = self.get(path).await;
        assert_eq!(res.status(), StatusCode::OK, "GET {path}");
        json(res).await
    }
}

fn encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            b' ' => "+".to_owned(),
            b => format!("%{b:02X}"),
        })
        .collect()
}

pub fn location(res: &Response<Body>) -> &str {
    assert_eq!(res.status(), StatusCode::SEE_OTHER, "expected a redirect");
    res.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

pub async fn text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn json(res: Response<Body>) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pulls the invite token out of a rendered `/invite/{token}` link.
pub fn invite_token(html: &str) -> String {
    let start = html.find("/invite/").expect("no invite link") + "/invite/".len();
    html[start..].chars().take_while(char::is_ascii_alphanumeric).collect()
}
