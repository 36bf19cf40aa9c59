/// Session context and credential extraction for Axum
///
/// The session middleware itself lives in the API crate (it needs the
/// application state); this module holds the pieces it is built from:
///
/// - [`AuthContext`]: the authenticated caller, inserted into request extensions
/// - [`AuthError`]: why a request was refused, rendered as a JSON 401/500
/// - [`bearer_token`]: pulls the token out of `Authorization: Bearer <token>`
/// - [`authenticate`]: validates an access token and loads the caller
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskdash_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello {} ({})", auth.name, auth.role.as_str())
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::{User, UserRole};

/// Authenticated caller, added to request extensions by the session middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    /// Builds the context from a freshly loaded user record
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// True when the caller is the owner of a resource
    pub fn owns(&self, resource_owner_id: Uuid) -> bool {
        self.user_id == resource_owner_id
    }
}

/// Error type for session authentication
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Token validation failed, or its user no longer exists
    InvalidToken(String),

    /// Token is valid but the account is suspended
    AccountSuspended,

    /// Database error while loading the user
    DatabaseError(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "Not authorized, no token".to_string(),
            AuthError::InvalidFormat(msg) => msg.clone(),
            AuthError::InvalidToken(msg) => msg.clone(),
            AuthError::AccountSuspended => "Account is suspended".to_string(),
            AuthError::DatabaseError(_) => "An internal error occurred".to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "Session lookup failed");
                "internal_error"
            }
            _ => "unauthorized",
        };

        let body = Json(json!({
            "error": error,
            "message": self.message(),
        }));

        (status, body).into_response()
    }
}

/// Extracts the bearer token from request headers
///
/// # Errors
///
/// - `MissingCredentials` if there is no readable `Authorization` header
/// - `InvalidFormat` if the header does not use the `Bearer` scheme
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Not authorized, no token".to_string()))?;

    Ok(token)
}

/// Validates an access token and resolves it to an active user
///
/// Every call reloads the user, so suspension and deletion take effect on the
/// caller's very next request rather than when the token expires.
pub async fn authenticate(
    pool: &PgPool,
    token: &str,
    access_secret: &str,
) -> Result<AuthContext, AuthError> {
    let claims = validate_access_token(token, access_secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Not authorized, token expired".to_string()),
        _ => AuthError::InvalidToken("Not authorized, token failed".to_string()),
    })?;

    let user = User::find_by_id(pool, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or_else(|| AuthError::InvalidToken("Not authorized, user not found".to_string()))?;

    if !user.is_active {
        return Err(AuthError::AccountSuspended);
    }

    Ok(AuthContext::from_user(&user))
}
