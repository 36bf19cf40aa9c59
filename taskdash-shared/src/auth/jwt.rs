/// Access and refresh token issuing and validation
///
/// Tokens are HS256-signed JWTs carrying the user ID as subject. Access and
/// refresh tokens are signed with two independent secrets, so an access token
/// can never pass refresh validation (and vice versa) even before the
/// `token_type` claim is checked.
///
/// # Token Types
///
/// - **Access Token**: Short-lived (15 minutes by default), sent as `Authorization: Bearer`
/// - **Refresh Token**: Long-lived (7 days by default), sent as an HttpOnly cookie and
///   stored server-side in the user's single refresh slot
///
/// # Example
///
/// ```
/// use taskdash_shared::auth::jwt::{issue_token_pair, validate_access_token, validate_refresh_token, JwtSettings};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = JwtSettings::new("access-secret", "refresh-secret");
/// let user_id = Uuid::new_v4();
///
/// let pair = issue_token_pair(user_id, &settings)?;
/// assert_eq!(validate_access_token(&pair.access_token, &settings.access_secret)?.sub, user_id);
/// assert_eq!(validate_refresh_token(&pair.refresh_token, &settings.refresh_secret)?.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into and required from every token
pub const ISSUER: &str = "taskdash";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token of the wrong type was presented
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid issuer
    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

impl TokenType {
    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Signing secrets and lifetimes for both token types
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// Secret for access tokens
    pub access_secret: String,

    /// Secret for refresh tokens (must differ from `access_secret`)
    pub refresh_secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl JwtSettings {
    /// Creates settings with the default lifetimes (15 minutes / 7 days)
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    /// Overrides both lifetimes
    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "taskdash")
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `jti`: Random token ID; two tokens issued in the same second still differ
///
/// # Custom Claims
///
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "taskdash"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token ID
    pub jti: Uuid,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims expiring `expires_in` from now
    ///
    /// # Example
    ///
    /// ```
    /// use taskdash_shared::auth::jwt::{Claims, TokenType};
    /// use chrono::Duration;
    /// use uuid::Uuid;
    ///
    /// let claims = Claims::new(Uuid::new_v4(), TokenType::Access, Duration::minutes(15)).unwrap();
    /// assert!(!claims.is_expired());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if the expiry is not a representable
    /// timestamp.
    pub fn new(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Result<Self, JwtError> {
        let now = Utc::now();
        let expiration = now.checked_add_signed(expires_in).ok_or_else(|| {
            JwtError::CreateError(format!(
                "Token lifetime of {} seconds is out of range",
                expires_in.num_seconds()
            ))
        })?;

        Ok(Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        })
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// An access token together with its refresh token
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a fresh access token for a user
pub fn issue_access_token(user_id: Uuid, settings: &JwtSettings) -> Result<String, JwtError> {
    let claims = Claims::new(user_id, TokenType::Access, settings.access_ttl)?;
    create_token(&claims, &settings.access_secret)
}

/// Issues an access token and a refresh token for a user
///
/// The two tokens are signed with independent secrets. Persisting the refresh
/// token (and thereby invalidating the previous one) is the caller's job.
pub fn issue_token_pair(user_id: Uuid, settings: &JwtSettings) -> Result<TokenPair, JwtError> {
    let access_token = issue_access_token(user_id, settings)?;

    let refresh_claims = Claims::new(user_id, TokenType::Refresh, settings.refresh_ttl)?;
    let refresh_token = create_token(&refresh_claims, &settings.refresh_secret)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Validates a JWT and extracts its claims
///
/// Verifies signature, expiration, not-before and issuer. Does not look at
/// `token_type`; use [`validate_access_token`] or [`validate_refresh_token`].
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}
