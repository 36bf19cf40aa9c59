/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST  /api/auth/register` - Create a member account
/// - `POST  /api/auth/login` - Issue a token pair
/// - `POST  /api/auth/refresh` - New access token from the refresh cookie
/// - `POST  /api/auth/logout` - Drop the refresh token
/// - `POST  /api/auth/forgot-password` - Email a reset link
/// - `PATCH /api/auth/reset-password/:token` - Set a new password with a reset token
///
/// # Session transport
///
/// The access token travels in the JSON body and then in
/// `Authorization: Bearer`. The refresh token only ever travels in the
/// `refreshToken` cookie (HttpOnly, SameSite=Strict, scoped to `/api/auth`).

use crate::{
    app::AppState,
    config::Config,
    error::{ApiError, ApiResult},
    extract::{not_blank, ValidJson},
    mail::OutgoingMail,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use taskdash_shared::{
    auth::{
        jwt::{self, JwtError},
        password::{hash_password, verify_password},
        reset_token::{hash_reset_token, is_well_formed, ResetToken},
    },
    models::user::{normalize_email, CreateUser, User, UserRole},
};
use uuid::Uuid;
use validator::Validate;

/// Name of the refresh-token cookie
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Path the refresh cookie is scoped to
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Body of every forgot-password response, whether or not the account exists
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a reset link has been sent.";

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_SESSION: &str = "Invalid session";
const INVALID_RESET_TOKEN: &str = "Invalid or expired token";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        custom(function = "not_blank", message = "All fields are required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "not_blank", message = "Email and password are required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Email and password are required"))]
    pub password: String,
}

/// Forgot-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Reset-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Generic `{message}` response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Account identity returned on registration
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: RegisteredUser,
}

/// Identity of the signed-in user, as the front end caches it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub access_token: String,
    pub user: SessionUser,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Builds the refresh-token cookie
pub fn refresh_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.is_production())
        .path(REFRESH_COOKIE_PATH)
        .max_age(time::Duration::days(config.jwt.refresh_ttl_days))
        .build()
}

/// Cookie that makes the browser drop the refresh token
fn expired_refresh_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, "")).path(REFRESH_COOKIE_PATH).build()
}

/// Register endpoint
///
/// ```text
/// POST /api/auth/register
/// { "name": "Ada", "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// New accounts are always members.
///
/// # Errors
///
/// - `400 Bad Request`: missing/blank fields, invalid email, short password,
///   or `"User already exists"`
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let email = normalize_email(&req.email);

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(&req.password)?;

    // A concurrent registration can still win the race; the unique index
    // turns that into the same 400 through From<sqlx::Error>
    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.trim().to_string(),
            email,
            password_hash,
            role: UserRole::Member,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: RegisteredUser {
                id: user.id,
                name: user.name,
                email: user.email,
            },
        }),
    ))
}

/// Login endpoint
///
/// ```text
/// POST /api/auth/login
/// { "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// On success the refresh token is stored on the user (replacing any
/// previous one) and set as the `refreshToken` cookie.
///
/// # Errors
///
/// - `400 Bad Request`: missing fields
/// - `401 Unauthorized`: `"Invalid credentials"` for an unknown email or a wrong password alike
/// - `403 Forbidden`: correct credentials on a suspended account
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let user = match User::find_by_email(&state.db, &req.email).await? {
        Some(user) => user,
        None => {
            tracing::debug!("Login failed: unknown email");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        tracing::info!(user_id = %user.id, "Login refused: account suspended");
        return Err(ApiError::Forbidden("Account is suspended".to_string()));
    }

    let pair = jwt::issue_token_pair(user.id, &state.jwt)?;
    User::set_refresh_token(&state.db, user.id, &pair.refresh_token).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    let jar = jar.add(refresh_cookie(pair.refresh_token, &state.config));

    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".to_string(),
            access_token: pair.access_token,
            user: SessionUser::from(&user),
        }),
    ))
}

/// Refresh endpoint
///
/// Reads the `refreshToken` cookie and, if it is the token currently stored
/// for its user, returns a new access token. The refresh token itself is not
/// rotated.
///
/// # Errors
///
/// - `401 Unauthorized`: no cookie, bad signature, expired, wrong token type,
///   unknown user, or a token that is no longer the stored one
/// - `403 Forbidden`: the account is suspended
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<RefreshResponse>> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let claims = jwt::validate_refresh_token(&presented, &state.jwt.refresh_secret).map_err(|e| {
        tracing::debug!(reason = %e, "Refresh rejected");
        match e {
            JwtError::Expired => ApiError::Unauthorized("Session expired".to_string()),
            _ => ApiError::Unauthorized(INVALID_SESSION.to_string()),
        }
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_SESSION.to_string()))?;

    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        tracing::info!(user_id = %user.id, "Refresh rejected: token is not the stored one");
        return Err(ApiError::Unauthorized(INVALID_SESSION.to_string()));
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is suspended".to_string()));
    }

    let access_token = jwt::issue_access_token(user.id, &state.jwt)?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout endpoint
///
/// Clears the stored refresh token of whoever holds the presented cookie and
/// tells the browser to drop the cookie. Always 200, with or without a cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        if !cookie.value().is_empty()
            && User::clear_refresh_token_matching(&state.db, cookie.value()).await?
        {
            tracing::info!("Refresh token revoked on logout");
        }
    }

    Ok((jar.remove(expired_refresh_cookie()), MessageResponse::new("Logged out")))
}

/// Forgot-password endpoint
///
/// ```text
/// POST /api/auth/forgot-password
/// { "email": "ada@example.com" }
/// ```
///
/// Always answers 200 with [`FORGOT_PASSWORD_MESSAGE`]. When the account
/// exists a reset token is stored (hashed) and the link is emailed; if the
/// email cannot be sent the token is discarded again and the failure is only
/// logged.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Some(user) = User::find_by_email(&state.db, &req.email).await? else {
        return Ok(MessageResponse::new(FORGOT_PASSWORD_MESSAGE));
    };

    let token = ResetToken::generate(state.config.reset_ttl());
    User::set_reset_token(&state.db, user.id, &token.hash, token.expires_at).await?;

    let mail = OutgoingMail::password_reset(
        &user.email,
        &user.name,
        &state.config.reset_link(&token.raw),
        state.config.reset.ttl_minutes,
    );

    match state.mailer.send(mail).await {
        Ok(()) => tracing::info!(user_id = %user.id, "Password reset link sent"),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Password reset email failed");
            if let Err(e) = User::clear_reset_token(&state.db, user.id).await {
                tracing::error!(user_id = %user.id, error = %e, "Failed to discard reset token");
            }
        }
    }

    Ok(MessageResponse::new(FORGOT_PASSWORD_MESSAGE))
}

/// Reset-password endpoint
///
/// ```text
/// PATCH /api/auth/reset-password/:token
/// { "password": "newsecret" }
/// ```
///
/// The token is single use. Redeeming it also ends the user's current
/// session (the stored refresh token is cleared).
///
/// # Errors
///
/// - `400 Bad Request`: short password, or `"Invalid or expired token"`
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if !is_well_formed(&token) {
        return Err(ApiError::BadRequest(INVALID_RESET_TOKEN.to_string()));
    }

    let password_hash = hash_password(&req.password)?;

    let user = User::reset_password_with_token(&state.db, &hash_reset_token(&token), &password_hash)
        .await?
        .ok_or_else(|| ApiError::BadRequest(INVALID_RESET_TOKEN.to_string()))?;

    tracing::info!(user_id = %user.id, "Password reset completed");

    Ok(MessageResponse::new("Password updated successfully"))
}
