use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("{present} is set but {missing} is not")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(AppEnv::Production),
            "development" | "dev" | "test" => Ok(AppEnv::Development),
            other => Err(format!("expected development or production, got {}", other)),
        }
    }
}

/// Salt and scrypt hash that gate account creation.
#[derive(Debug, Clone)]
pub struct RegisterKey {
    pub salt: String,
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenRouterSettings {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub base_url: String,
    pub env: AppEnv,
    pub uploads_dir_name: String,
    pub image_uploads_path: PathBuf,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub verification_token_minutes: i64,
    pub token_grace_seconds: i64,
    pub register_key: Option<RegisterKey>,
    pub smtp: Option<SmtpSettings>,
    pub admin_email: Option<String>,
    pub open_router: Option<OpenRouterSettings>,
    pub extraction_language: String,
    pub labels_file: Option<PathBuf>,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: "instance/site.db".to_string(),
            base_url: "http://localhost:3000".to_string(),
            env: AppEnv::Development,
            uploads_dir_name: "static".to_string(),
            image_uploads_path: PathBuf::from("./public/static/recipe-images"),
            access_token_minutes: 15,
            refresh_token_days: 7,
            verification_token_minutes: 60,
            token_grace_seconds: 5,
            register_key: None,
            smtp: None,
            admin_email: None,
            open_router: None,
            extraction_language: "French".to_string(),
            labels_file: None,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    /// Builds a config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let vars = Vars { lookup: &lookup };

        let register_key = match (vars.get("REGISTER_KEY_SALT"), vars.get("REGISTER_KEY_HASH")) {
            (Some(salt), Some(hash)) => Some(RegisterKey { salt, hash }),
            (None, None) => {
                warn!("REGISTER_KEY_SALT and REGISTER_KEY_HASH not set, registration is disabled");
                None
            }
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: "REGISTER_KEY_SALT",
                    missing: "REGISTER_KEY_HASH",
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: "REGISTER_KEY_HASH",
                    missing: "REGISTER_KEY_SALT",
                })
            }
        };

        let smtp = match vars.get("MAIL_SERVER") {
            Some(server) => Some(SmtpSettings {
                server,
                port: vars.parse("MAIL_PORT", 587)?,
                use_tls: vars.parse_bool("MAIL_USE_TLS", true)?,
                username: vars.get("MAIL_USERNAME"),
                password: vars.get("MAIL_PASSWORD"),
            }),
            None => {
                info!("MAIL_SERVER not set, emails will only be logged");
                None
            }
        };

        let admin_email = vars
            .get("ADMIN_EMAIL")
            .or_else(|| smtp.as_ref().and_then(|s| s.username.clone()));

        let open_router = match (vars.get("OPEN_ROUTER_API_KEY"), vars.get("OPEN_ROUTER_MODEL_ID")) {
            (Some(api_key), Some(model)) => Some(OpenRouterSettings { api_key, model }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: "OPEN_ROUTER_API_KEY",
                    missing: "OPEN_ROUTER_MODEL_ID",
                })
            }
            _ => {
                info!("OPEN_ROUTER_API_KEY not set, recipe extraction is unavailable");
                None
            }
        };

        let cors_origins = match vars.get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => defaults.cors_origins.clone(),
        };

        let config = Config {
            bind_addr: vars.string("BIND_ADDR", &defaults.bind_addr),
            database_url: vars.string("DATABASE_URL", &defaults.database_url),
            base_url: vars
                .string("APP_BASE_URL", &defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            env: vars.parse("APP_ENV", defaults.env)?,
            uploads_dir_name: vars
                .string("UPLOADS_DIR_NAME", &defaults.uploads_dir_name)
                .trim_matches('/')
                .to_string(),
            image_uploads_path: vars
                .get("IMAGE_UPLOADS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.image_uploads_path),
            access_token_minutes: vars.positive("ACCESS_TOKEN_MINUTES", defaults.access_token_minutes)?,
            refresh_token_days: vars.positive("REFRESH_TOKEN_DAYS", defaults.refresh_token_days)?,
            verification_token_minutes: vars
                .positive("VERIFICATION_TOKEN_MINUTES", defaults.verification_token_minutes)?,
            token_grace_seconds: vars.parse("TOKEN_GRACE_SECONDS", defaults.token_grace_seconds)?,
            register_key,
            smtp,
            admin_email,
            open_router,
            extraction_language: vars.string("EXTRACTION_LANGUAGE", &defaults.extraction_language),
            labels_file: vars.get("LABELS_FILE").map(PathBuf::from),
            cors_origins,
        };

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnv::Production
    }

    /// Public URL of a stored cover image.
    pub fn cover_url(&self, image: &str) -> String {
        format!(
            "{}/{}/recipe-images/{}",
            self.base_url, self.uploads_dir_name, image
        )
    }

    pub fn frontend_url(&self, path: &str, token: &str) -> String {
        format!("{}/{}?token={}", self.base_url, path.trim_start_matches('/'), token)
    }
}

struct Vars<'a, F> {
    lookup: &'a F,
}

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Display,
        T::Err: Display,
    {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
                warn!("Invalid {key} value: {e}");
                ConfigError::Invalid {
                    key,
                    message: e.to_string(),
                }
            }),
            None => Ok(default),
        }
    }

    fn positive(&self, key: &'static str, default: i64) -> Result<i64, ConfigError> {
        let value = self.parse(key, default)?;
        if value <= 0 {
            return Err(ConfigError::Invalid {
                key,
                message: format!("must be positive, got {}", value),
            });
        }
        Ok(value)
    }

    fn parse_bool(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    key,
                    message: format!("expected a boolean, got {}", v),
                }),
            },
        }
    }
}

impl Display for AppEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppEnv::Development => f.write_str("development"),
            AppEnv::Production => f.write_str("production"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.access_token_minutes, 15);
        assert_eq!(config.refresh_token_days, 7);
        assert!(config.register_key.is_none());
        assert!(config.smtp.is_none());
        assert!(config.open_router.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_admin_email_falls_back_to_mail_username() {
        let config = config_from(&[
            ("MAIL_SERVER", "smtp.example.com"),
            ("MAIL_USERNAME", "noreply@example.com"),
        ])
        .unwrap();
        assert_eq!(config.admin_email.as_deref(), Some("noreply@example.com"));
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert!(smtp.use_tls);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = config_from(&[("ACCESS_TOKEN_MINUTES", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ACCESS_TOKEN_MINUTES", .. }));

        let err = config_from(&[("REFRESH_TOKEN_DAYS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "REFRESH_TOKEN_DAYS", .. }));
    }

    #[test]
    fn test_half_configured_register_key_is_rejected() {
        let err = config_from(&[("REGISTER_KEY_SALT", "abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete { missing: "REGISTER_KEY_HASH", .. }));
    }

    #[test]
    fn test_cover_url_uses_uploads_dir() {
        let config = config_from(&[
            ("APP_BASE_URL", "https://recipes.example.com/"),
            ("UPLOADS_DIR_NAME", "/files/"),
        ])
        .unwrap();
        assert_eq!(
            config.cover_url("abc.jpg"),
            "https://recipes.example.com/files/recipe-images/abc.jpg"
        );
    }

    #[test]
    fn test_production_env() {
        let config = config_from(&[("APP_ENV", "production")]).unwrap();
        assert!(config.is_production());
        assert!(config_from(&[("APP_ENV", "staging")]).is_err());
    }
}
