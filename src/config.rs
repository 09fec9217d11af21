use anyhow::{Context, Result};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    /// Idle seconds before a session is dropped, 0 disables the check.
    pub session_timeout: u64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Documents
    pub template_dir: PathBuf,
    pub media_root: PathBuf,
    pub employee_code_prefix: String,
    pub payslip_deduction: Decimal,

    // Logging
    pub log_dir: String,
    pub log_level: String,

    /// First admin account, created at start-up if the username is free.
    pub admin_seed: Option<AdminSeed>,
}

#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Both `ADMIN_USERNAME` and `ADMIN_PASSWORD` or neither.
fn admin_seed(username: Option<String>, password: Option<String>) -> Result<Option<AdminSeed>> {
    let username = username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    let password = password.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(AdminSeed { username, password })),
        (None, None) => Ok(None),
        _ => anyhow::bail!("ADMIN_USERNAME and ADMIN_PASSWORD must be set together"),
    }
}

/// Reads an optional variable, falling back to `default` when unset.
fn var_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {raw:?}"))
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", "900")?, // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", "604800")?, // 7 days
            session_timeout: var_or("SESSION_TIMEOUT", "1800")?,

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            template_dir: var_or("TEMPLATE_DIR", "templates")?,
            media_root: var_or("MEDIA_ROOT", "media")?,
            employee_code_prefix: env::var("EMPLOYEE_CODE_PREFIX")
                .unwrap_or_else(|_| "STPL".to_string())
                .trim()
                .to_uppercase(),
            payslip_deduction: var_or("PAYSLIP_DEDUCTION", "200")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),

            admin_seed: admin_seed(env::var("ADMIN_USERNAME").ok(), env::var("ADMIN_PASSWORD").ok())?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for tests that never touch the network or database.
    pub fn for_tests(media_root: PathBuf, template_dir: PathBuf) -> Self {
        Self {
            database_url: "mysql://localhost/test".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            session_timeout: 1800,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            template_dir,
            media_root,
            employee_code_prefix: "STPL".to_string(),
            payslip_deduction: Decimal::from(200),
            log_dir: "logs".to_string(),
            log_level: "debug".to_string(),
            admin_seed: None,
        }
    }
}
