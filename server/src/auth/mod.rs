mod crypto;
mod db;
mod extractor;
mod middleware;

pub use crypto::{
    generate_token, hash_password, hash_register_key, hash_token, verify_password,
    verify_register_key, PasswordCheck,
};
pub use db::{
    clean_expired, consume_verification, create_session, create_verification, expire_session,
    find_session_by_tokens, get_user_from_token, revoke_all_sessions, session_is_refreshable,
    AuthSession, ClientInfo, IssuedTokens, EMAIL_VERIFICATION_PREFIX, RESET_PASSWORD_PREFIX,
};
pub use extractor::{AuthError, AuthUser, CurrentSession};
pub use middleware::require_auth;
