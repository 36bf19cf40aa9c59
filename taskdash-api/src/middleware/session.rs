/// Session middleware and role gate
///
/// [`require_session`] guards every protected route group: it validates the
/// bearer access token, reloads the user, refuses suspended accounts and
/// inserts an [`AuthContext`] for the handlers. It never retries; an expired
/// token is the client's cue to refresh.
///
/// [`role_gate`] runs after it and checks the caller's role against an
/// allow-list.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use taskdash_api::app::AppState;
/// use taskdash_api::middleware::session::{require_session, role_gate, ADMIN_ONLY};
///
/// fn admin_routes(state: AppState) -> Router<AppState> {
///     Router::new()
///         .route("/", get(|| async { "admins only" }))
///         .route_layer(middleware::from_fn(role_gate(ADMIN_ONLY)))
///         .route_layer(middleware::from_fn_with_state(state, require_session))
/// }
/// ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::{future::Future, pin::Pin};
use taskdash_shared::{
    auth::{
        authorization::require_role,
        middleware::{authenticate, bearer_token, AuthContext},
    },
    models::user::UserRole,
};

use crate::{app::AppState, error::ApiError};

/// Allow-list for administrator-only route groups
pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// Allow-list for routes open to every signed-in role
pub const ANY_ROLE: &[UserRole] = &[UserRole::Member, UserRole::Admin];

/// Session middleware
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - Authorization header is missing or not `Bearer <token>`
/// - Token is invalid, expired or not an access token
/// - The user no longer exists
/// - The user is suspended
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?.to_owned();

    let auth = authenticate(&state.db, &token, &state.config.jwt.secret)
        .await
        .map_err(|e| {
            tracing::debug!(reason = %e, "Session rejected");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Creates a role-gate middleware closure for an allow-list of roles
///
/// Must be layered inside [`require_session`]; a request without an
/// [`AuthContext`] is refused with 401.
pub fn role_gate(
    allowed: &'static [UserRole],
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, ApiError>> + Send>> + Clone
{
    move |req, next| {
        Box::pin(async move {
            let auth = req
                .extensions()
                .get::<AuthContext>()
                .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

            if let Err(e) = require_role(auth, allowed) {
                tracing::warn!(user_id = %auth.user_id, role = %auth.role, "Role gate refused request");
                return Err(e.into());
            }

            Ok(next.run(req).await)
        })
    }
}
