use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use subtle::ConstantTimeEq;

/// Use insecure (fast) password hashing for dev/test environments
static INSECURE_HASHING: LazyLock<bool> =
    LazyLock::new(|| std::env::var("INSECURE_PASSWORD_HASHING").is_ok());

/// Werkzeug's scrypt defaults, used when a legacy hash omits its parameters.
const WERKZEUG_N: u64 = 32768;
const WERKZEUG_R: u32 = 8;
const WERKZEUG_P: u32 = 1;
const SCRYPT_KEY_LEN: usize = 64;

/// Register key parameters (Node's `scryptSync` defaults).
const REGISTER_KEY_LOG_N: u8 = 14;
const REGISTER_KEY_R: u32 = 8;
const REGISTER_KEY_P: u32 = 1;

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn get_argon2() -> Argon2<'static> {
    if *INSECURE_HASHING {
        // Minimal params for fast dev/test - NOT SECURE FOR PRODUCTION
        Params::new(1024, 1, 1, None)
            .map(|params| Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
            .unwrap_or_default()
    } else {
        Argon2::default()
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = get_argon2().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Invalid,
    Valid,
    /// Correct password stored in the legacy scrypt format.
    ValidNeedsRehash,
}

impl PasswordCheck {
    pub fn is_valid(self) -> bool {
        self != PasswordCheck::Invalid
    }
}

pub fn verify_password(password: &str, hash: &str) -> PasswordCheck {
    if hash.starts_with("scrypt") {
        return if verify_werkzeug_scrypt(password, hash) {
            PasswordCheck::ValidNeedsRehash
        } else {
            PasswordCheck::Invalid
        };
    }

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return PasswordCheck::Invalid,
    };
    // Argon2 reads its parameters from the PHC string, so fast test hashes verify too
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => PasswordCheck::Valid,
        Err(_) => PasswordCheck::Invalid,
    }
}

fn derive_scrypt(secret: &str, salt: &[u8], log_n: u8, r: u32, p: u32) -> Option<Vec<u8>> {
    let params = scrypt::Params::new(log_n, r, p, SCRYPT_KEY_LEN).ok()?;
    let mut out = vec![0u8; SCRYPT_KEY_LEN];
    scrypt::scrypt(secret.as_bytes(), salt, &params, &mut out).ok()?;
    Some(out)
}

fn ct_eq_hex(expected_hex: &str, actual: &[u8]) -> bool {
    match hex::decode(expected_hex.trim()) {
        Ok(expected) => expected.len() == actual.len() && bool::from(expected.ct_eq(actual)),
        Err(_) => false,
    }
}

/// Verifies `scrypt[:N:r:p]$salt$hexdigest` hashes written by Werkzeug.
/// The salt is used as its UTF-8 bytes, not decoded.
fn verify_werkzeug_scrypt(password: &str, hash: &str) -> bool {
    let mut parts = hash.splitn(3, '$');
    let (Some(method), Some(salt), Some(digest)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Some((n, r, p)) = parse_scrypt_method(method) else {
        tracing::warn!(method, "unsupported legacy hash method");
        return false;
    };
    if !n.is_power_of_two() || n < 2 {
        return false;
    }
    let log_n = n.trailing_zeros() as u8;

    match derive_scrypt(password, salt.as_bytes(), log_n, r, p) {
        Some(derived) => ct_eq_hex(digest, &derived),
        None => false,
    }
}

fn parse_scrypt_method(method: &str) -> Option<(u64, u32, u32)> {
    let mut fields = method.split(':');
    if fields.next()? != "scrypt" {
        return None;
    }
    match (fields.next(), fields.next(), fields.next()) {
        (None, _, _) => Some((WERKZEUG_N, WERKZEUG_R, WERKZEUG_P)),
        (Some(n), Some(r), Some(p)) => Some((n.parse().ok()?, r.parse().ok()?, p.parse().ok()?)),
        _ => None,
    }
}

/// Checks a candidate register key against the configured salt and hash.
pub fn verify_register_key(key: &str, salt: &str, expected_hash: &str) -> bool {
    match derive_scrypt(
        key,
        salt.as_bytes(),
        REGISTER_KEY_LOG_N,
        REGISTER_KEY_R,
        REGISTER_KEY_P,
    ) {
        Some(derived) => ct_eq_hex(expected_hash, &derived),
        None => false,
    }
}

/// Produces a fresh `(salt, hash)` pair for `REGISTER_KEY_SALT`/`REGISTER_KEY_HASH`.
pub fn hash_register_key(key: &str) -> Option<(String, String)> {
    let mut salt_bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    let hash = derive_scrypt(
        key,
        salt.as_bytes(),
        REGISTER_KEY_LOG_N,
        REGISTER_KEY_R,
        REGISTER_KEY_P,
    )?;
    Some((salt, hex::encode(hash)))
}
