use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use uuid::Uuid;

use crate::{AppState, error::AppError, utils::verify_token};

/// 通过认证的用户，由 auth_middleware 写入请求扩展
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.config.jwt_secret.as_deref() else {
        tracing::warn!("JWT_SECRET is not configured, rejecting authenticated route");
        return Err(AppError::Unauthorized);
    };

    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(bearer.token(), secret).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized
    })?;

    let id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser { id });

    Ok(next.run(request).await)
}
