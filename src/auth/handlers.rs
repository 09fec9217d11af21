use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{
            TokenSubject, generate_access_token, generate_refresh_token, new_session_id,
            verify_token,
        },
        middleware::{SESSION_EXPIRED, bearer_token},
        password::{hash_password, verify_password},
        session::{SessionInfo, SessionStore},
    },
    config::Config,
    error::{AppError, AppResult},
    model::{role::Role, user::User},
    models::{Claims, CreateUserReq, LoginReqDto, TokenPair, TokenType},
    utils::presence::USERNAMES,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::internal(format!("failed to sign token: {e}"))
}

/// Signs a fresh token pair for `subject` and records the refresh token.
async fn issue_pair(
    pool: &MySqlPool,
    config: &Config,
    subject: &TokenSubject,
    sid: &str,
) -> AppResult<TokenPair> {
    let access_token =
        generate_access_token(subject, sid, &config.jwt_secret, config.access_token_ttl)
            .map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, sid, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, session_id, expires_at)
        VALUES (?, ?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(subject.user_id)
    .bind(&refresh_claims.jti)
    .bind(sid)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> AppResult<Claims> {
    let token = bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("Refresh token required".to_string()))?;
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".to_string()));
    }
    Ok(claims)
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 401, description = "Invalid username or password")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, sessions, user),
    fields(username = %user.username.trim())
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    let username = user.username.trim();
    let password = user.password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, is_active, last_login_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(db_user) = db_user.filter(|u| u.is_active) else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };

    if let Err(e) = verify_password(password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: db_user.role_id,
    };
    let sid = new_session_id();
    let pair = issue_pair(pool.get_ref(), &config, &subject, &sid).await?;

    sessions
        .open(
            &sid,
            SessionInfo {
                user_id: db_user.id,
                username: db_user.username.clone(),
            },
        )
        .await;

    // non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/// A refresh token rotates only if this request was the one that revoked it.
fn claim_rotation(rows_revoked: u64) -> AppResult<()> {
    if rows_revoked == 1 {
        Ok(())
    } else {
        warn!(rows_revoked, "Refresh token already rotated");
        Err(AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, revoked or session expired")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> AppResult<HttpResponse> {
    let claims = refresh_claims(&req, &config)?;

    let record = sqlx::query_as::<_, (u64, bool)>(
        "SELECT id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let record_id = match record {
        Some((id, false)) => id,
        _ => {
            warn!(user_id = claims.user_id, "Refresh with unknown or revoked token");
            return Err(AppError::Unauthorized("Invalid or expired token".to_string()));
        }
    };

    if sessions.touch(&claims.sid).await.is_none() {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE session_id = ?")
            .bind(&claims.sid)
            .execute(pool.get_ref())
            .await?;
        return Err(AppError::Unauthorized(SESSION_EXPIRED.to_string()));
    }

    // Only one of two concurrent refreshes with the same token may rotate it.
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE id = ? AND revoked = FALSE",
    )
    .bind(record_id)
    .execute(pool.get_ref())
    .await?
    .rows_affected();
    claim_rotation(revoked)?;

    let subject = TokenSubject {
        user_id: claims.user_id,
        username: claims.sub.clone(),
        role: claims.role,
    };
    let pair = issue_pair(pool.get_ref(), &config, &subject, &claims.sid).await?;

    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    sessions: web::Data<SessionStore>,
) -> HttpResponse {
    let claims = match bearer_token(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    sessions.close(&claims.sid).await;

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE session_id = ?")
        .bind(&claims.sid)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh tokens on logout");
    }

    info!(user_id = claims.user_id, "Logged out");
    HttpResponse::NoContent().finish()
}

/// true  => username AVAILABLE
/// false => username TAKEN
async fn is_username_available(username: &str, pool: &MySqlPool) -> AppResult<bool> {
    if !USERNAMES.might_exist(username) {
        return Ok(true);
    }
    if USERNAMES.is_known_taken(username).await {
        return Ok(false);
    }

    let exists: bool = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(username)
    .fetch_one(pool)
    .await?
        != 0;

    if exists {
        USERNAMES.mark_taken(username).await;
    }
    Ok(!exists)
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully."
        })),
        (status = 400, description = "Username or password empty"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "User already exists.")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn create_user(
    auth: AuthUser,
    payload: web::Json<CreateUserReq>,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let username = payload.username.trim();
    let password = payload.password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::bad_request(
            "Username and password must not be empty",
        ));
    }

    let role = match payload.role_id {
        None => Role::Hr,
        Some(id) => Role::from_id(id).ok_or_else(|| AppError::bad_request("Unknown role."))?,
    };

    if !is_username_available(username, pool.get_ref()).await? {
        return Err(AppError::conflict("User already exists."));
    }

    let hashed = hash_password(password)
        .map_err(|e| AppError::internal(format!("failed to hash password: {e}")))?;

    let result = sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(username)
        .bind(&hashed)
        .bind(role.id())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {}
        Err(e) if AppError::is_unique_violation(&e) => {
            USERNAMES.mark_taken(username).await;
            return Err(AppError::conflict("User already exists."));
        }
        Err(e) => return Err(e.into()),
    }

    USERNAMES.mark_taken(username).await;
    info!(created_by = auth.user_id, %username, %role, "User created");

    Ok(HttpResponse::Created().json(json!({ "message": "User created successfully." })))
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "admin")]
    pub role: String,
    pub total_employees: i64,
    pub draft_employees: i64,
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Signed-in user and employee counts", body = DashboardResponse)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn dashboard(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(pool.get_ref())
        .await?;
    let draft_employees =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE is_draft = TRUE")
            .fetch_one(pool.get_ref())
            .await?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        username: auth.username,
        role: auth.role.to_string(),
        total_employees,
        draft_employees,
    }))
}
