use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}
