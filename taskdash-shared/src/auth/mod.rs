/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: Access/refresh token issuing and validation
/// - [`reset_token`]: One-shot password reset tokens (random, stored hashed)
/// - [`middleware`]: Per-request session context and auth errors
/// - [`authorization`]: Role gate and self-protection rules
///
/// # Example
///
/// ```no_run
/// use taskdash_shared::auth::password::{hash_password, verify_password};
/// use taskdash_shared::auth::jwt::{issue_token_pair, validate_access_token, JwtSettings};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let settings = JwtSettings::new("access-secret-at-least-32-bytes-long", "refresh-secret-at-least-32-bytes-long");
/// let pair = issue_token_pair(Uuid::new_v4(), &settings)?;
/// let claims = validate_access_token(&pair.access_token, &settings.access_secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
