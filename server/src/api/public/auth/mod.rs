pub mod forgot_password;
pub mod login;
pub mod refresh;
pub mod register;
pub mod register_key;
pub mod reset_password;
pub mod verify_email;

use crate::api::account::me::UserResponse;
use crate::auth::{create_session, ClientInfo};
use crate::config::Config;
use crate::error::AppError;
use crate::mail::{templates, Email, Mailer};
use crate::models::User;
use crate::schema::users;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

pub const REFRESH_COOKIE: &str = "famiglia-recipes.refresh_token";
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";
pub const MOBILE_HEADER: &str = "x-is-mobile";
pub const INVALID_TOKEN_MESSAGE: &str = "This is an invalid or an expired token.";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only set for mobile clients; browsers get an HttpOnly cookie instead.
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

pub fn is_mobile(headers: &HeaderMap) -> bool {
    headers
        .get(MOBILE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    ClientInfo {
        ip_address: header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .or_else(|| header_str("x-real-ip")),
        user_agent: header_str(header::USER_AGENT.as_str()),
    }
}

pub fn refresh_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path(REFRESH_COOKIE_PATH)
        .max_age(time::Duration::days(config.refresh_token_days))
        .build()
}

pub fn clear_refresh_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(REFRESH_COOKIE).path(REFRESH_COOKIE_PATH))
}

/// Opens a session for `user` and shapes the reply for mobile or browser clients.
pub fn sign_in(
    conn: &mut SqliteConnection,
    config: &Config,
    headers: &HeaderMap,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, TokenResponse), AppError> {
    let tokens = create_session(conn, config, user.id, &client_info(headers))?;

    let (jar, refresh_token) = if is_mobile(headers) {
        (jar, Some(tokens.refresh_token))
    } else {
        (jar.add(refresh_cookie(tokens.refresh_token, config)), None)
    };

    Ok((
        jar,
        TokenResponse {
            access_token: tokens.access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: config.access_token_minutes * 60,
            user: UserResponse::from(user),
        },
    ))
}

/// Case-insensitive email lookup.
pub fn find_user_by_email(conn: &mut SqliteConnection, email: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(
            diesel::dsl::sql::<diesel::sql_types::Bool>("email = ")
                .bind::<diesel::sql_types::Text, _>(email.trim())
                .sql(" COLLATE NOCASE"),
        )
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Sends the verification email. Failures are logged, never returned.
pub async fn send_verification_email(mailer: &dyn Mailer, config: &Config, user: &User, token: &str) {
    let link = config.frontend_url("verify-email", token);
    let (subject, html) = templates::verification_email(&user.name, &link);
    let email = Email {
        to: user.email.clone(),
        subject,
        html,
    };
    if let Err(e) = mailer.send(email).await {
        tracing::error!(user_id = user.id, error = %e, "failed to send verification email");
    }
}
