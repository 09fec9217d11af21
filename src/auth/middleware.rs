use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::{debug, info};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;

pub const SESSION_EXPIRED: &str = "Your session has expired due to inactivity.";

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    req.into_response(resp.map_into_boxed_body())
}

/// Bearer `Authorization` value, without the scheme.
pub fn bearer_token(req: &actix_web::HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Authenticates the access token and enforces the session idle timeout.
pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let sessions = req
        .app_data::<Data<SessionStore>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Session store missing"))?;

    let token = bearer_token(req.request())
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let Some(token) = token else {
        return Ok(unauthorized(req, "Missing or malformed Authorization header"));
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected token");
            return Ok(unauthorized(req, "Invalid or expired token"));
        }
    };

    if claims.token_type != TokenType::Access {
        return Ok(unauthorized(req, "Access token required"));
    }

    let Some(role) = Role::from_id(claims.role) else {
        return Ok(unauthorized(req, "Invalid role"));
    };

    if sessions.touch(&claims.sid).await.is_none() {
        info!(user_id = claims.user_id, "Session expired");
        sessions.close(&claims.sid).await;
        return Ok(unauthorized(req, SESSION_EXPIRED));
    }

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        sid: claims.sid,
    });

    next.call(req).await
}
