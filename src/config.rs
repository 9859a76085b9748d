use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};
use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Scheme, host and port the app is reachable at, used to build mailed and invite links.
    pub public_origin: String,
    pub session_inactivity_minutes: i64,
    pub secure_cookies: bool,
    pub require_email_confirmation: bool,
    pub access_key_salt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://choreroom.db?mode=rwc".to_owned(),
            port: 8080,
            public_origin: "http://localhost:8080".to_owned(),
            session_inactivity_minutes: 60 * 24 * 7,
            secure_cookies: false,
            require_email_confirmation: true,
            access_key_salt: "choreroomaccesskeysalt".to_owned(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            database_url: try_load("DATABASE_URL", defaults.database_url)?,
            port: try_load("PORT", defaults.port)?,
            public_origin: try_load::<String>("PUBLIC_ORIGIN", defaults.public_origin)?
                .trim_end_matches('/')
                .to_owned(),
            session_inactivity_minutes: try_load(
                "SESSION_INACTIVITY_MINUTES",
                defaults.session_inactivity_minutes,
            )?,
            secure_cookies: try_load("SECURE_COOKIES", defaults.secure_cookies)?,
            require_email_confirmation: try_load(
                "REQUIRE_EMAIL_CONFIRMATION",
                defaults.require_email_confirmation,
            )?,
            access_key_salt: try_load("ACCESS_KEY_SALT", defaults.access_key_salt)?,
        };
        check_access_key_salt(&config.access_key_salt).context("invalid ACCESS_KEY_SALT")?;

        Ok(config)
    }

    pub fn link(&self, path: &str) -> String {
        format!("{}{path}", self.public_origin)
    }
}

/// Access-key salts must be unpadded B64 and long enough for argon2.
fn check_access_key_salt(salt: &str) -> anyhow::Result<()> {
    let salt = SaltString::from_b64(salt).map_err(|e| anyhow!("{e}"))?;
    Argon2::default()
        .hash_password(b"access key", &salt)
        .map_err(|e| anyhow!("{e}"))?;
    Ok(())
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("invalid {key} value")),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
