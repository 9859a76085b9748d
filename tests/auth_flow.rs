mod common;

use choreroom::config::Config;
use common::{location, TestApp};

#[tokio::test]
async fn signed_out_visitors_are_sent_to_login() {
    let app = TestApp::new().await;
    let mut client = app.client();

    for path in ["/", "/dashboard", "/auth/callback"] {
        let res = client.get(path).await;
        assert_eq!(location(&res), "/login", "GET {path}");
    }

    let page = client.page("/login").await;
    assert!(page.contains("Log in"));
}

#[tokio::test]
async fn sign_up_requires_confirmation_by_default() {
    let app = TestApp::with_config(Config::default()).await;
    let mut client = app.client();
    let creds = [("email", "alice@example.com"), ("password", "hunter22")];

    let res = client.post_form("/signup", &creds).await;
    assert_eq!(location(&res), "/login");
    assert!(client.page("/login").await.contains("Account created. Check your email to confirm"));

    let res = client.post_form("/login", &creds).await;
    assert_eq!(location(&res), "/login");
    assert!(client.page("/login").await.contains("Email not confirmed"));

    let link = app.mailer.last_link_to("alice@example.com").unwrap();
    let path = link.strip_prefix(&Config::default().public_origin).unwrap().to_owned();
    let res = client.get(&path).await;
    assert_eq!(location(&res), "/dashboard");

    let dashboard = client.page("/dashboard").await;
    assert!(dashboard.contains("Email confirmed."));
    assert!(dashboard.contains("alice@example.com"));

    // Confirmation links are single use.
    let res = app.client().get(&path).await;
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn duplicate_and_malformed_sign_ups_are_reported() {
    let app = TestApp::new().await;
    app.user("bob@example.com").await;
    let mut client = app.client();

    client.post_form("/signup", &[("email", "BOB@example.com"), ("password", "hunter22")]).await;
    assert!(client.page("/login").await.contains("User already registered"));

    client.post_form("/signup", &[("email", "not-an-email"), ("password", "hunter22")]).await;
    assert!(client.page("/login").await.contains("Unable to validate email address: invalid format"));

    client.post_form("/signup", &[("email", "carol@example.com"), ("password", "abc")]).await;
    assert!(client.page("/login").await.contains("Password should be at least 6 characters."));

    client.post_form("/login/reset", &[("email", "")]).await;
    assert!(client.page("/login").await.contains("Enter your email first."));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    app.user("dave@example.com").await;
    let mut client = app.client();

    let res = client.post_form("/login", &[("email", "dave@example.com"), ("password", "wrong-one")]).await;
    assert_eq!(location(&res), "/login");
    assert!(client.page("/login").await.contains("Invalid login credentials"));
    assert_eq!(location(&client.get("/").await), "/login");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let mut client = app.user("erin@example.com").await;
    assert_eq!(location(&client.get("/").await), "/dashboard");

    let res = client.post_form("/logout", &[]).await;
    assert_eq!(location(&res), "/login");
    assert_eq!(location(&client.get("/dashboard").await), "/login");
}

#[tokio::test]
async fn password_can_be_reset_through_the_mailed_link() {
    let app = TestApp::new().await;
    app.user("frank@example.com").await;
    let mut client = app.client();

    client.post_form("/login/reset", &[("email", "frank@example.com")]).await;
    assert!(client.page("/login").await.contains("Password reset email sent."));

    let link = app.mailer.last_link_to("frank@example.com").unwrap();
    let path = link.strip_prefix(&Config::default().public_origin).unwrap().to_owned();
    let res = client.get(&path).await;
    assert_eq!(location(&res), "/auth/reset-password");
    assert!(client.page("/auth/reset-password").await.contains("password"));

    let res = client.post_form("/auth/reset-password", &[("password", "brand-new")]).await;
    assert_eq!(location(&res), "/dashboard");
    assert!(client.page("/dashboard").await.contains("Password updated."));

    let mut other = app.client();
    let res = other.post_form("/login", &[("email", "frank@example.com"), ("password", "brand-new")]).await;
    assert_eq!(location(&res), "/dashboard");
}

#[tokio::test]
async fn reset_page_needs_a_recovery_link() {
    let app = TestApp::new().await;
    let mut client = app.client();

    let res = client.get("/auth/reset-password").await;
    assert_eq!(location(&res), "/login");

    let res = client.get("/auth/callback?type=recovery&token=bogus").await;
    assert_eq!(location(&res), "/login");
    let page = client.page("/login").await;
    assert!(page.contains("Email link is invalid or has expired."));
}

#[tokio::test]
async fn confirming_email_returns_to_the_invite() {
    let app = TestApp::with_config(Config::default()).await;
    let mut client = app.client();

    let res = client.get("/invite/sometoken").await;
    assert_eq!(location(&res), "/login");

    client.post_form("/signup", &[("email", "gina@example.com"), ("password", "hunter22")]).await;
    let link = app.mailer.last_link_to("gina@example.com").unwrap();
    let path = link.strip_prefix(&Config::default().public_origin).unwrap().to_owned();

    let res = client.get(&path).await;
    assert_eq!(location(&res), "/invite/sometoken");
}
