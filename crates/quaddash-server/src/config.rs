use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::info;

/// Server configuration, read from QUADDASH_* environment variables
/// (a .env file is honored when present).
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    /// Institutional parent domain for the email allow-list.
    pub email_domain: String,
    pub platform_fee_percent: i64,
    pub webhook_secret: String,
    pub smtp: Option<SmtpConfig>,
}

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            host: load_or("QUADDASH_HOST", "0.0.0.0"),
            port: parse_or("QUADDASH_PORT", "3001")?,
            db_path: load_or("QUADDASH_DB_PATH", "quaddash.db"),
            jwt_secret: load_or("QUADDASH_JWT_SECRET", "dev-secret-change-me"),
            email_domain: load_or("QUADDASH_EMAIL_DOMAIN", "upenn.edu"),
            platform_fee_percent: parse_or("QUADDASH_PLATFORM_FEE_PERCENT", "5")?,
            webhook_secret: load_or("QUADDASH_WEBHOOK_SECRET", "whsec-dev-change-me"),
            smtp: Self::load_smtp()?,
        })
    }

    /// SMTP is optional: without QUADDASH_SMTP_HOST the server falls back to
    /// the dev mailer, which surfaces codes in the send-code response.
    fn load_smtp() -> anyhow::Result<Option<SmtpConfig>> {
        let Ok(host) = env::var("QUADDASH_SMTP_HOST") else {
            info!("QUADDASH_SMTP_HOST not set, using dev code delivery");
            return Ok(None);
        };

        Ok(Some(SmtpConfig {
            host,
            port: parse_or("QUADDASH_SMTP_PORT", "587")?,
            username: env::var("QUADDASH_SMTP_USERNAME").ok(),
            password: env::var("QUADDASH_SMTP_PASSWORD").ok(),
            from: load_or("QUADDASH_SMTP_FROM", "Quaddash <noreply@quaddash.dev>"),
        }))
    }
}

fn load_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}

fn parse_or<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    load_or(key, default)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {} value: {}", key, e))
}
