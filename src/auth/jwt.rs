use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

/// Who a token is issued to.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: u64,
    pub username: String,
    pub role: u8,
}

fn issue(
    subject: &TokenSubject,
    sid: &str,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        sid: sid.to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims))
}

pub fn generate_access_token(
    subject: &TokenSubject,
    sid: &str,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    issue(subject, sid, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    subject: &TokenSubject,
    sid: &str,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    issue(subject, sid, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
