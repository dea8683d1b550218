use crate::config::Config;
use crate::db::DbPool;
use crate::models::{NewSession, NewVerification, Session, User};
use crate::schema::{sessions, users, verifications};
use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;

use super::crypto::{generate_token, hash_token};

pub const EMAIL_VERIFICATION_PREFIX: &str = "email-verification";
pub const RESET_PASSWORD_PREFIX: &str = "reset-password";

/// Plain tokens handed to the client. Only their hashes are stored.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: NaiveDateTime,
}

/// Request metadata stored alongside a session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The authenticated user plus the session the access token belongs to.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub session_id: i32,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn create_session(
    conn: &mut SqliteConnection,
    config: &Config,
    user_id: i32,
    client: &ClientInfo,
) -> QueryResult<IssuedTokens> {
    let access_token = generate_token();
    let refresh_token = generate_token();
    let access_hash = hash_token(&access_token);
    let refresh_hash = hash_token(&refresh_token);
    let created_at = now();
    let access_expires_at = created_at + Duration::minutes(config.access_token_minutes);
    let refresh_expires_at = created_at + Duration::days(config.refresh_token_days);

    diesel::insert_into(sessions::table)
        .values(&NewSession {
            user_id,
            access_token_hash: &access_hash,
            access_expires_at,
            refresh_token_hash: &refresh_hash,
            refresh_expires_at,
            created_at,
            ip_address: client.ip_address.as_deref(),
            user_agent: client.user_agent.as_deref(),
        })
        .execute(conn)?;

    tracing::debug!(user_id, "session created");

    Ok(IssuedTokens {
        access_token,
        refresh_token,
        access_expires_at,
    })
}

/// Shortens both token lifetimes to the grace window so in-flight requests
/// using the old tokens still succeed.
pub fn expire_session(
    conn: &mut SqliteConnection,
    session_id: i32,
    grace_seconds: i64,
) -> QueryResult<()> {
    let until = now() + Duration::seconds(grace_seconds);
    diesel::update(sessions::table.find(session_id))
        .set((
            sessions::access_expires_at.eq(until),
            sessions::refresh_expires_at.eq(until),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn revoke_all_sessions(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<usize> {
    let revoked =
        diesel::delete(sessions::table.filter(sessions::user_id.eq(user_id))).execute(conn)?;
    tracing::info!(user_id, revoked, "revoked all sessions");
    Ok(revoked)
}

/// Drops sessions whose refresh token expired over a day ago, plus expired verifications.
pub fn clean_expired(conn: &mut SqliteConnection) -> QueryResult<(usize, usize)> {
    let cutoff = now() - Duration::days(1);
    let old_sessions =
        diesel::delete(sessions::table.filter(sessions::refresh_expires_at.lt(cutoff)))
            .execute(conn)?;
    let old_verifications =
        diesel::delete(verifications::table.filter(verifications::expires_at.lt(now())))
            .execute(conn)?;
    if old_sessions + old_verifications > 0 {
        tracing::debug!(old_sessions, old_verifications, "cleaned expired tokens");
    }
    Ok((old_sessions, old_verifications))
}

/// Session matching both tokens, regardless of expiry.
pub fn find_session_by_tokens(
    conn: &mut SqliteConnection,
    access_token: &str,
    refresh_token: &str,
) -> QueryResult<Option<Session>> {
    sessions::table
        .filter(sessions::access_token_hash.eq(hash_token(access_token)))
        .filter(sessions::refresh_token_hash.eq(hash_token(refresh_token)))
        .select(Session::as_select())
        .first(conn)
        .optional()
}

pub fn session_is_refreshable(session: &Session) -> bool {
    session.refresh_expires_at > now()
}

pub async fn get_user_from_token(pool: &DbPool, token: &str) -> Option<AuthSession> {
    let mut conn = pool.get().ok()?;
    let token_hash = hash_token(token);
    let current = now();

    let (mut user, session_id): (User, i32) = sessions::table
        .inner_join(users::table)
        .filter(sessions::access_token_hash.eq(&token_hash))
        .filter(sessions::access_expires_at.gt(current))
        .select((User::as_select(), sessions::id))
        .first(&mut conn)
        .ok()?;

    match diesel::update(users::table.find(user.id))
        .set(users::last_seen.eq(current))
        .execute(&mut conn)
    {
        Ok(_) => user.last_seen = Some(current),
        Err(e) => tracing::warn!(user_id = user.id, error = %e, "failed to update last_seen"),
    }

    Some(AuthSession { user, session_id })
}

fn identifier_for(prefix: &str, user_id: i32) -> String {
    format!("{}:{}", prefix, user_id)
}

/// Stores a fresh single-use token for `prefix:user_id`, replacing older ones.
pub fn create_verification(
    conn: &mut SqliteConnection,
    prefix: &str,
    user_id: i32,
    valid_minutes: i64,
) -> QueryResult<String> {
    let identifier = identifier_for(prefix, user_id);
    let token = generate_token();
    let token_hash = hash_token(&token);
    let created_at = now();

    conn.transaction(|conn| {
        diesel::delete(verifications::table.filter(verifications::identifier.eq(&identifier)))
            .execute(conn)?;
        diesel::insert_into(verifications::table)
            .values(&NewVerification {
                identifier: &identifier,
                value: &token_hash,
                expires_at: created_at + Duration::minutes(valid_minutes),
                created_at,
            })
            .execute(conn)
    })?;

    Ok(token)
}

/// Deletes the token and returns its user id when it is valid for `prefix`.
/// Expired tokens are deleted too but yield `None`.
pub fn consume_verification(
    conn: &mut SqliteConnection,
    prefix: &str,
    token: &str,
) -> QueryResult<Option<i32>> {
    let token_hash = hash_token(token);
    conn.transaction(|conn| {
        let row: Option<(i32, String, NaiveDateTime)> = verifications::table
            .filter(verifications::value.eq(&token_hash))
            .select((
                verifications::id,
                verifications::identifier,
                verifications::expires_at,
            ))
            .first(conn)
            .optional()?;

        let Some((id, identifier, expires_at)) = row else {
            return Ok(None);
        };

        let user_id = identifier
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|raw| raw.parse::<i32>().ok());

        // A token for another purpose stays usable for that purpose
        let Some(user_id) = user_id else {
            return Ok(None);
        };

        diesel::delete(verifications::table.find(id)).execute(conn)?;

        if expires_at <= now() {
            return Ok(None);
        }
        Ok(Some(user_id))
    })
}
