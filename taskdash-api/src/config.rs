/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first when present) into a typed [`Config`].
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:7005)
/// - `APP_ENV`: `production` or `development` (default: development)
/// - `CORS_ORIGINS`: comma-separated allowed origins, `*` for any (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET` / `REFRESH_SECRET`: token signing secrets (required, 32+ chars, distinct)
/// - `JWT_ACCESS_TTL_MINUTES` / `JWT_REFRESH_TTL_DAYS`: token lifetimes (default: 15 / 7)
/// - `RESET_TOKEN_TTL_MINUTES`: password reset window (default: 10)
/// - `RESET_URL_BASE`: prefix of emailed reset links
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`: outgoing mail; unset logs mail instead
/// - `MAIL_FROM`: sender address
/// - `BOOTSTRAP_ADMIN_EMAIL`, `BOOTSTRAP_ADMIN_PASSWORD`, `BOOTSTRAP_ADMIN_NAME`: admin ensured at startup
///
/// # Example
///
/// ```no_run
/// use taskdash_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use taskdash_shared::auth::jwt::JwtSettings;

/// Minimum length of each signing secret
const MIN_SECRET_LENGTH: usize = 32;

const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;
const MAX_REFRESH_TTL_DAYS: i64 = 365;
const MAX_RESET_TTL_MINUTES: i64 = 24 * 60;

const DEFAULT_RESET_URL_BASE: &str = "http://localhost:5173/reset-password";
const DEFAULT_MAIL_FROM: &str = "TaskDash <no-reply@taskdash.local>";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub reset: ResetConfig,
    pub mail: MailConfig,

    /// Administrator account ensured at startup
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,

    /// Allowed browser origins; empty means any origin (no credentials)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Access token secret. Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Refresh token secret, distinct from `secret`
    pub refresh_secret: String,

    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

/// Password reset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    pub ttl_minutes: i64,

    /// Front-end page the emailed link points at; the raw token is appended
    pub url_base: String,
}

/// Outgoing mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from: String,

    /// None: mail is written to the log instead of being sent
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// Administrator account ensured at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(var("API_PORT"), 7005u16, "API_PORT")?;
        let environment = var("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);
        let cors_origins = parse_origins(var("CORS_ORIGINS").as_deref().unwrap_or("*"));

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(var("DATABASE_MAX_CONNECTIONS"), 10u32, "DATABASE_MAX_CONNECTIONS")?;

        let secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        let refresh_secret = var("REFRESH_SECRET")
            .ok_or_else(|| anyhow::anyhow!("REFRESH_SECRET environment variable is required"))?;

        if secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if refresh_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("REFRESH_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        if secret == refresh_secret {
            anyhow::bail!("JWT_SECRET and REFRESH_SECRET must differ");
        }

        let access_ttl_minutes = parse_lifetime(
            var("JWT_ACCESS_TTL_MINUTES"),
            15,
            MAX_ACCESS_TTL_MINUTES,
            "JWT_ACCESS_TTL_MINUTES",
        )?;
        let refresh_ttl_days =
            parse_lifetime(var("JWT_REFRESH_TTL_DAYS"), 7, MAX_REFRESH_TTL_DAYS, "JWT_REFRESH_TTL_DAYS")?;
        let reset_ttl_minutes = parse_lifetime(
            var("RESET_TOKEN_TTL_MINUTES"),
            10,
            MAX_RESET_TTL_MINUTES,
            "RESET_TOKEN_TTL_MINUTES",
        )?;

        let url_base = var("RESET_URL_BASE")
            .unwrap_or_else(|| DEFAULT_RESET_URL_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let smtp = match var("SMTP_HOST") {
            Some(smtp_host) => Some(SmtpConfig {
                host: smtp_host,
                port: parse_or(var("SMTP_PORT"), 587u16, "SMTP_PORT")?,
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
            }),
            None => None,
        };

        let bootstrap_admin = match (var("BOOTSTRAP_ADMIN_EMAIL"), var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: var("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            }),
            (Some(_), None) | (None, Some(_)) => {
                anyhow::bail!("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together")
            }
            (None, None) => None,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                environment,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret,
                refresh_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            reset: ResetConfig {
                ttl_minutes: reset_ttl_minutes,
                url_base,
            },
            mail: MailConfig {
                from: var("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
                smtp,
            },
            bootstrap_admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn is_production(&self) -> bool {
        self.api.environment == Environment::Production
    }

    /// Token issuer settings derived from the JWT section
    pub fn jwt_settings(&self) -> JwtSettings {
        JwtSettings::new(self.jwt.secret.clone(), self.jwt.refresh_secret.clone()).with_ttls(
            Duration::minutes(self.jwt.access_ttl_minutes),
            Duration::days(self.jwt.refresh_ttl_days),
        )
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.jwt.refresh_ttl_days)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::minutes(self.reset.ttl_minutes)
    }

    /// Link emailed to a user for a raw reset token
    pub fn reset_link(&self, raw_token: &str) -> String {
        format!("{}/{}", self.reset.url_base, raw_token)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T, key: &str) -> anyhow::Result<T> {
    match value {
        Some(v) => v
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, v)),
        None => Ok(default),
    }
}

fn parse_lifetime(value: Option<String>, default: i64, max: i64, key: &str) -> anyhow::Result<i64> {
    let parsed = parse_or(value, default, key)?;
    if parsed <= 0 {
        anyhow::bail!("{} must be positive", key);
    }
    if parsed > max {
        anyhow::bail!("{} must be at most {}", key, max);
    }
    Ok(parsed)
}

fn parse_origins(raw: &str) -> Vec<String> {
    if raw.trim() == "*" {
        return Vec::new();
    }

    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
