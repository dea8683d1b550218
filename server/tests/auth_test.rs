mod common;

use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use common::{TestApp, PASSWORD, REGISTER_KEY};
use diesel::prelude::*;
use famiglia_server::auth::hash_token;
use famiglia_server::schema::sessions;
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::spawn();
    let res = app.json(Method::GET, "/api/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
}

#[tokio::test]
async fn test_register_sends_verification_email() {
    let app = TestApp::spawn();

    let res = app.register("Nonna Maria", "Maria@Example.com").await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.body["user_id"].as_i64().is_some());

    let mail = app
        .mailer
        .last_to("maria@example.com")
        .expect("verification email");
    assert!(mail.html.contains("http://localhost:3000/verify-email?token="));
    assert_eq!(common::token_from(&mail).len(), 64);
}

#[tokio::test]
async fn test_register_rejects_bad_key() {
    let app = TestApp::spawn();
    let res = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Intruder",
                "email": "intruder@example.com",
                "password": PASSWORD,
                "register_key": "guess",
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_register_disabled_without_key() {
    let app = TestApp::spawn_with(|config| config.register_key = None, true);
    let res = app.register("Zio", "zio@example.com").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_validates_fields() {
    let app = TestApp::spawn();
    let res = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "",
                "email": "not-an-email",
                "password": "short",
                "register_key": REGISTER_KEY,
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Please fix the form errors");
    let paths: Vec<&str> = res.body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["email", "name", "password"]);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::spawn();
    assert_eq!(
        app.register("Maria", "maria@example.com").await.status,
        StatusCode::CREATED
    );
    let res = app.register("Other Maria", "MARIA@example.com").await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_key_check() {
    let app = TestApp::spawn();
    let good = app
        .json(
            Method::POST,
            "/api/auth/register-key",
            None,
            Some(json!({ "key": REGISTER_KEY })),
        )
        .await;
    assert_eq!(good.body["valid"], true);

    let bad = app
        .json(
            Method::POST,
            "/api/auth/register-key",
            None,
            Some(json!({ "key": "nope" })),
        )
        .await;
    assert_eq!(bad.body["valid"], false);
}

#[tokio::test]
async fn test_unverified_login_resends_email() {
    let app = TestApp::spawn();
    app.register("Maria", "maria@example.com").await;
    let first = app.last_token_for("maria@example.com");

    let res = app.login("maria@example.com", PASSWORD, false).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.mailer.sent().len(), 2);

    // The resent token replaces the first one
    let second = app.last_token_for("maria@example.com");
    assert_ne!(first, second);
    let stale = app
        .json(
            Method::POST,
            "/api/auth/verify-email",
            None,
            Some(json!({ "token": first })),
        )
        .await;
    assert_eq!(stale.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_email_signs_in_once() {
    let app = TestApp::spawn();
    app.register("Maria", "maria@example.com").await;
    let token = app.last_token_for("maria@example.com");

    let res = app
        .json(
            Method::POST,
            "/api/auth/verify-email",
            None,
            Some(json!({ "token": token })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["token_type"], "Bearer");
    assert_eq!(res.body["user"]["email_verified"], true);

    let again = app
        .json(
            Method::POST,
            "/api/auth/verify-email",
            None,
            Some(json!({ "token": token })),
        )
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.error(), "This is an invalid or an expired token.");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::spawn();
    app.signup("Maria", "maria@example.com").await;

    let res = app.login("maria@example.com", "wrong-password", false).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error(), "Invalid email or password");

    let unknown = app.login("nobody@example.com", PASSWORD, false).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.error(), "Invalid email or password");
}

#[tokio::test]
async fn test_browser_login_sets_refresh_cookie() {
    let app = TestApp::spawn();
    app.signup("Maria", "maria@example.com").await;

    let res = app.login("MARIA@example.com", PASSWORD, false).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["refresh_token"].is_null());
    assert_eq!(res.body["expires_in"], 15 * 60);

    let cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("refresh cookie");
    assert!(cookie.starts_with("famiglia-recipes.refresh_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=None"));
    assert!(cookie.contains("Path=/api/auth"));
}

#[tokio::test]
async fn test_mobile_login_returns_refresh_token() {
    let app = TestApp::spawn();
    app.signup("Maria", "maria@example.com").await;

    let res = app.login("maria@example.com", PASSWORD, true).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["refresh_token"].as_str().unwrap().len(), 64);
    assert!(res.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let app = TestApp::spawn();
    let token = app.signup("Maria", "maria@example.com").await;

    let anonymous = app.json(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let bogus = app.get("/api/users/me", "deadbeef").await;
    assert_eq!(bogus.status, StatusCode::UNAUTHORIZED);

    let me = app.get("/api/users/me", &token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["name"], "Maria");
    assert_eq!(me.body["email"], "maria@example.com");
    assert_eq!(me.body["role"], "user");
    assert!(!me.body["last_seen"].is_null());
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = TestApp::spawn();
    app.signup("Maria", "maria@example.com").await;
    let login = app.login("maria@example.com", PASSWORD, true).await;
    let access = login.body["access_token"].as_str().unwrap().to_string();
    let refresh = login.body["refresh_token"].as_str().unwrap().to_string();

    let res = app
        .json_with_headers(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "access_token": access, "refresh_token": refresh })),
            &[("x-is-mobile", "true")],
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let new_access = res.body["access_token"].as_str().unwrap();
    assert_ne!(new_access, access);
    assert_eq!(app.get("/api/users/me", new_access).await.status, StatusCode::OK);

    // The old pair is inside its grace window, not gone
    assert_eq!(app.get("/api/users/me", &access).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let app = TestApp::spawn();
    app.signup("Maria", "maria@example.com").await;
    let login = app.login("maria@example.com", PASSWORD, false).await;
    let access = login.body["access_token"].as_str().unwrap().to_string();
    let cookie = login
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let res = app
        .json_with_headers(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "access_token": access })),
            &[("cookie", cookie.as_str())],
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.headers.get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn test_refresh_with_unknown_pair_is_unauthorized() {
    let app = TestApp::spawn();
    let res = app
        .json(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "access_token": "a", "refresh_token": "b" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_refresh_reuse_revokes_everything() {
    let app = TestApp::spawn();
    app.signup("Maria", "maria@example.com").await;
    let stolen = app.login("maria@example.com", PASSWORD, true).await;
    let other = app.login("maria@example.com", PASSWORD, true).await;
    let access = stolen.body["access_token"].as_str().unwrap();
    let refresh = stolen.body["refresh_token"].as_str().unwrap();

    {
        let mut conn = app.state.pool.get().unwrap();
        diesel::update(
            sessions::table.filter(sessions::refresh_token_hash.eq(hash_token(refresh))),
        )
        .set(sessions::refresh_expires_at.eq(Utc::now().naive_utc() - Duration::minutes(1)))
        .execute(&mut conn)
        .unwrap();
    }

    let res = app
        .json(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "access_token": access, "refresh_token": refresh })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let other_access = other.body["access_token"].as_str().unwrap();
    assert_eq!(
        app.get("/api/users/me", other_access).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_logout_expires_session_after_grace() {
    let app = TestApp::spawn_with(|config| config.token_grace_seconds = 0, true);
    let token = app.signup("Maria", "maria@example.com").await;

    let res = app
        .json(Method::POST, "/api/auth/logout", Some(&token), None)
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let cleared = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cleared.starts_with("famiglia-recipes.refresh_token="));

    assert_eq!(
        app.get("/api/users/me", &token).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_forgot_password_unknown_email_is_silent() {
    let app = TestApp::spawn();
    let res = app
        .json(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::spawn();
    let old_token = app.signup("Maria", "maria@example.com").await;

    let res = app
        .json(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({
                "email": "Maria@example.com",
                "callback": "http://127.0.0.1:3000/reset"
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let mail = app.mailer.last_to("maria@example.com").unwrap();
    assert!(mail.html.contains("http://127.0.0.1:3000/reset?token="));
    let reset_token = common::token_from(&mail);

    // A reset token cannot verify an email
    let cross = app
        .json(
            Method::POST,
            "/api/auth/verify-email",
            None,
            Some(json!({ "token": reset_token })),
        )
        .await;
    assert_eq!(cross.status, StatusCode::BAD_REQUEST);

    let res = app
        .json(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": reset_token, "new_password": "new-password-456" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    // Every session is gone and only the new password works
    assert_eq!(
        app.get("/api/users/me", &old_token).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("maria@example.com", PASSWORD, false).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("maria@example.com", "new-password-456", false)
            .await
            .status,
        StatusCode::OK
    );

    let reused = app
        .json(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": reset_token, "new_password": "another-password" })),
        )
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
    assert_eq!(reused.error(), "This is an invalid or an expired token.");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::spawn();
    let res = app
        .json(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["paths"]["/api/recipes"].is_object());
}
