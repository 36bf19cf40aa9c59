/// User administration and self-service endpoints
///
/// Every route sits behind the session middleware. Administrative routes are
/// additionally wrapped in `role_gate(ADMIN_ONLY)` by the router; the
/// per-target rules (no acting on yourself, no acting on another admin) are
/// checked here with [`ensure_can_moderate`].

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{not_blank, ValidJson},
    mail::OutgoingMail,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskdash_shared::{
    auth::{
        authorization::{ensure_can_moderate, require_self_or_permission, Permission},
        middleware::AuthContext,
        password::{hash_password, unusable_password_hash, verify_password},
        reset_token::ResetToken,
    },
    models::user::{normalize_email, CreateUser, UpdateUserProfile, User, UserRole},
};
use uuid::Uuid;
use validator::Validate;

use super::auth::MessageResponse;

const USER_NOT_FOUND: &str = "User not found";

/// Public view of an account; never carries hashes or tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// List response
#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub success: bool,
    pub count: usize,
    pub users: Vec<UserSummary>,
}

/// Admin add-user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        custom(function = "not_blank", message = "Name is required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Admin profile edit
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        custom(function = "not_blank", message = "Name cannot be blank"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: Option<String>,

    pub role: Option<UserRole>,
}

/// Delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    pub message: String,
}

/// Status toggle response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub message: String,
    pub is_active: bool,
}

/// Self-service rename
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNameRequest {
    #[validate(
        custom(function = "not_blank", message = "Name is required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,
}

/// Self-service rename response
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateNameResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Self-service password change
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

async fn load_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))
}

/// List all users, newest first
///
/// ```text
/// GET /api/users
/// ```
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<UserListResponse>> {
    let users: Vec<UserSummary> = User::list(&state.db)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    Ok(Json(UserListResponse {
        success: true,
        count: users.len(),
        users,
    }))
}

/// Admin add-user
///
/// ```text
/// POST /api/users
/// { "name": "Bob", "email": "bob@example.com", "role": "member" }
/// ```
///
/// The account starts with a password nobody knows; the invitation email
/// carries a reset link to choose one. If the email cannot be sent the
/// account is kept and the user can still go through forgot-password.
///
/// # Errors
///
/// - `400 Bad Request`: invalid body or `"User already exists"`
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserSummary>)> {
    let email = normalize_email(&req.email);

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.trim().to_string(),
            email,
            password_hash: unusable_password_hash()?,
            role: req.role.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(admin_id = %auth.user_id, user_id = %user.id, role = %user.role, "User added by admin");

    let token = ResetToken::generate(state.config.reset_ttl());
    User::set_reset_token(&state.db, user.id, &token.hash, token.expires_at).await?;

    let mail = OutgoingMail::invitation(
        &user.email,
        &user.name,
        &state.config.reset_link(&token.raw),
        state.config.reset.ttl_minutes,
    );

    if let Err(e) = state.mailer.send(mail).await {
        tracing::error!(user_id = %user.id, error = %e, "Invitation email failed");
        User::clear_reset_token(&state.db, user.id).await?;
    }

    Ok((StatusCode::CREATED, Json(UserSummary::from(user))))
}

/// Get one user
///
/// Administrators can read anyone; members only themselves.
///
/// # Errors
///
/// - `403 Forbidden`: a member asking for another account
/// - `404 Not Found`: no such user
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserSummary>> {
    require_self_or_permission(&auth, id, Permission::ViewAllUsers)?;

    let user = load_user(&state, id).await?;

    Ok(Json(UserSummary::from(user)))
}

/// Edit a member's name or role
///
/// ```text
/// PATCH /api/users/:id
/// { "name": "Robert", "role": "admin" }
/// ```
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> ApiResult<Json<UserSummary>> {
    let target = load_user(&state, id).await?;
    ensure_can_moderate(&auth, target.id, target.role)?;

    let user = User::update_profile(
        &state.db,
        id,
        UpdateUserProfile {
            name: req.name.map(|n| n.trim().to_string()),
            role: req.role,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    tracing::info!(admin_id = %auth.user_id, user_id = %user.id, role = %user.role, "User updated by admin");

    Ok(Json(UserSummary::from(user)))
}

/// Delete a member account and, through the foreign key, its tasks
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteUserResponse>> {
    let target = load_user(&state, id).await?;
    ensure_can_moderate(&auth, target.id, target.role)?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(USER_NOT_FOUND.to_string()));
    }

    tracing::info!(admin_id = %auth.user_id, user_id = %id, "User deleted");

    Ok(Json(DeleteUserResponse {
        success: true,
        message: "User deleted successfully".to_string(),
    }))
}

/// Suspend or reactivate a member
///
/// ```text
/// PATCH /api/users/:id/status
/// ```
///
/// Suspension takes effect at once: the stored refresh token is dropped and
/// the session middleware refuses the member's current access token on the
/// next request.
pub async fn toggle_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusResponse>> {
    let target = load_user(&state, id).await?;
    ensure_can_moderate(&auth, target.id, target.role)?;

    let user = User::set_active(&state.db, id, !target.is_active)
        .await?
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    let state_word = if user.is_active { "activated" } else { "suspended" };
    tracing::info!(admin_id = %auth.user_id, user_id = %user.id, "User {}", state_word);

    Ok(Json(StatusResponse {
        message: format!("User has been {}", state_word),
        is_active: user.is_active,
    }))
}

/// Rename the caller
pub async fn update_name(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<UpdateNameRequest>,
) -> ApiResult<Json<UpdateNameResponse>> {
    let user = User::update_profile(
        &state.db,
        auth.user_id,
        UpdateUserProfile {
            name: Some(req.name.trim().to_string()),
            role: None,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.to_string()))?;

    Ok(Json(UpdateNameResponse {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

/// Change the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: `"Current password is incorrect"` or a short new password
pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidJson(req): ValidJson<UpdatePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let user = load_user(&state, auth.user_id).await?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::BadRequest("Current password is incorrect".to_string()));
    }

    let password_hash = hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(MessageResponse::new("Password updated successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Member,
            is_active: true,
            refresh_token: Some("refresh".to_string()),
            password_reset_token_hash: Some("hash".to_string()),
            password_reset_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_summary_hides_secrets() {
        let json = serde_json::to_value(UserSummary::from(sample_user())).unwrap();
        let text = json.to_string();

        assert_eq!(json["isActive"], true);
        assert_eq!(json["role"], "member");
        assert!(json.get("createdAt").is_some());
        assert!(!text.contains("argon2"));
        assert!(!text.contains("refresh"));
        assert!(!text.contains("hash"));
    }

    #[test]
    fn test_create_user_request_role_optional() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"name":"Bob","email":"bob@example.com"}"#).unwrap();
        assert!(req.role.is_none());
        assert!(req.validate().is_ok());

        let req: CreateUserRequest =
            serde_json::from_str(r#"{"name":"Bob","email":"bob@example.com","role":"admin"}"#).unwrap();
        assert_eq!(req.role, Some(UserRole::Admin));
    }

    #[test]
    fn test_update_user_request_rejects_blank_name() {
        let req = UpdateUserRequest {
            name: Some("   ".to_string()),
            role: None,
        };
        assert!(req.validate().is_err());

        let req = UpdateUserRequest {
            name: None,
            role: Some(UserRole::Admin),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_password_request_wire_format() {
        let req: UpdatePasswordRequest =
            serde_json::from_str(r#"{"currentPassword":"old-pass","newPassword":"12345"}"#).unwrap();
        assert_eq!(req.current_password, "old-pass");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_status_response_wire_format() {
        let json = serde_json::to_value(StatusResponse {
            message: "User has been suspended".to_string(),
            is_active: false,
        })
        .unwrap();
        assert_eq!(json["isActive"], false);
    }
}
