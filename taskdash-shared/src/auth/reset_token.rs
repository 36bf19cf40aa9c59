/// Password reset tokens
///
/// A reset token is 32 random bytes, hex-encoded (64 characters), handed to
/// the user inside an emailed link. Only its SHA-256 digest is stored, next to
/// an expiry timestamp; the lookup on redemption hashes the presented token
/// and matches on the digest.
///
/// # Example
///
/// ```
/// use taskdash_shared::auth::reset_token::{hash_reset_token, ResetToken};
/// use chrono::Duration;
///
/// let token = ResetToken::generate(Duration::minutes(10));
/// assert_eq!(token.raw.len(), 64);
/// assert_eq!(hash_reset_token(&token.raw), token.hash);
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a reset token
const TOKEN_BYTES: usize = 32;

/// Hex length of a raw reset token
pub const RESET_TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// A freshly generated reset token
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Plaintext token. Only ever sent to the user, never stored
    pub raw: String,

    /// SHA-256 hex digest of `raw`, stored on the user record
    pub hash: String,

    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Generates a token valid for `ttl` from now
    pub fn generate(ttl: Duration) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        let raw = hex::encode(bytes);
        let hash = hash_reset_token(&raw);

        Self {
            raw,
            hash,
            expires_at: Utc::now() + ttl,
        }
    }
}

/// Hashes a raw reset token using SHA-256 (hex output, 64 characters)
pub fn hash_reset_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cheap shape check run before touching the database
pub fn is_well_formed(raw: &str) -> bool {
    raw.len() == RESET_TOKEN_LENGTH && raw.chars().all(|c| c.is_ascii_hexdigit())
}
