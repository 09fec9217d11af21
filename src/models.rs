use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[schema(example = "hr.manager")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    /// 1 = admin, 2 = HR. Defaults to HR.
    #[schema(example = 2)]
    pub role_id: Option<u8>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,
    /// Login session shared by every token issued from one login.
    pub sid: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
