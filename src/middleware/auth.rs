use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

/// Basic authentication middleware
/// Validates `Authorization: Basic <base64(client_id:client_secret)>`
pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Basic ") => &header[6..],
        _ => {
            return Err(AppError::Unauthorized(
                "credential is not specified".to_string(),
            ));
        }
    };

    if !state.basic_auth.check_credential(token).await? {
        return Err(AppError::Unauthorized("credential is not valid".to_string()));
    }

    Ok(next.run(request).await)
}
