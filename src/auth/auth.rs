use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use serde::Serialize;

use crate::error::AppError;
use crate::model::role::Role;

/// The caller of a protected route, placed in request extensions by
/// [`session_middleware`](crate::auth::middleware::session_middleware).
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    /// Login session the token belongs to.
    #[serde(skip)]
    pub sid: String,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string())),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "admin".to_string(),
            role,
            sid: "sid".to_string(),
        }
    }

    #[actix_web::test]
    async fn extracts_user_from_extensions() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(user(Role::Hr));
        let extracted = AuthUser::extract(&req).await.unwrap();
        assert_eq!(extracted.role, Role::Hr);
    }

    #[actix_web::test]
    async fn missing_user_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = AuthUser::extract(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn only_admins_pass_admin_check() {
        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(matches!(
            user(Role::Hr).require_admin(),
            Err(AppError::Forbidden(_))
        ));
    }
}
