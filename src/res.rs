use axum::{
    debug_handler,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::session::{Notice, NoticeKind};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], include_res!(str, "/style.css"))
}

/// Wraps a page body in the shared layout.
pub fn page(title: &str, body: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/layout.html")
            .replace("{body}", body)
            .replace("{title}", &escape(title)),
    )
}

pub fn sorry(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        page(
            "Not found",
            &include_res!(str, "/pages/sorry.html").replace("{what}", &escape(what)),
        ),
    )
        .into_response()
}

pub fn notice_html(notice: Option<&Notice>) -> String {
    let Some(notice) = notice else {
        return String::new();
    };

    let class = match notice.kind {
        NoticeKind::Success => "notice success",
        NoticeKind::Error => "notice error",
    };
    let link = notice
        .link
        .as_deref()
        .map(|link| {
            let link = escape(link);
            format!(r#" <a class="mono" href="{link}">{link}</a>"#)
        })
        .unwrap_or_default();

    format!(r#"<p class="{class}">{}{link}</p>"#, escape(&notice.text))
}

/// Escapes user text for HTML. Braces are escaped too so user text never
/// reads as a template placeholder in a later `replace`.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            c => out.push(c),
        }
    }
    out
}
