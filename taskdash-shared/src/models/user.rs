/// User model and database operations
///
/// Users are the credential store: each row carries the password hash, the
/// role, the suspension flag, the single refresh-token slot and the pending
/// password-reset token (hashed) with its expiry.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('member', 'admin');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'member',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     refresh_token TEXT,
///     password_reset_token_hash VARCHAR(64),
///     password_reset_expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdash_shared::models::user::{normalize_email, CreateUser, User, UserRole};
/// use taskdash_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/taskdash", 5)).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Ada".to_string(),
///     email: normalize_email(" Ada@Example.com "),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Member,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::authorization::Permission;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account: own tasks and profile only
    #[default]
    Member,

    /// Manages accounts and sees the system-wide dashboard
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Admin => "admin",
        }
    }

    /// Whether this role holds a permission
    ///
    /// # Example
    ///
    /// ```
    /// use taskdash_shared::auth::authorization::Permission;
    /// use taskdash_shared::models::user::UserRole;
    ///
    /// assert!(UserRole::Admin.can(Permission::ManageUsers));
    /// assert!(!UserRole::Member.can(Permission::ManageUsers));
    /// assert!(UserRole::Member.can(Permission::ManageOwnTasks));
    /// ```
    pub fn can(&self, permission: Permission) -> bool {
        match (self, permission) {
            (_, Permission::ManageOwnTasks) => true,
            (UserRole::Admin, _) => true,
            (UserRole::Member, _) => false,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(UserRole::Member),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User model representing an account
///
/// Secrets (`password_hash`, `refresh_token`, reset fields) are never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub name: String,

    /// Stored trimmed and lowercased, unique
    pub email: String,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,

    /// False once an administrator suspends the account
    pub is_active: bool,

    /// The one refresh token currently accepted for this user
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,

    /// SHA-256 hex digest of the pending reset token
    #[serde(skip_serializing)]
    pub password_reset_token_hash: Option<String>,

    #[serde(skip_serializing)]
    pub password_reset_expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,

    /// Should already be normalized with [`normalize_email`]
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub role: UserRole,
}

/// Administrative profile edit; only `Some` fields change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserProfile {
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

/// Canonical form of an email address: trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Whether a reset token is pending and has not expired yet
    pub fn has_pending_reset(&self) -> bool {
        matches!(
            (&self.password_reset_token_hash, self.password_reset_expires_at),
            (Some(_), Some(expires_at)) if expires_at > Utc::now()
        )
    }

    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, role, is_active, refresh_token,
                      password_reset_token_hash, password_reset_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use taskdash_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_id(&pool, user_id).await? {
    ///     println!("Found user: {}", user.email);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, is_active, refresh_token,
                   password_reset_token_hash, password_reset_expires_at,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// The address is normalized before the lookup, so `" Ada@Example.com "`
    /// finds the account registered as `ada@example.com`.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, is_active, refresh_token,
                   password_reset_token_hash, password_reset_expires_at,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists all users, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, is_active, refresh_token,
                   password_reset_token_hash, password_reset_expires_at,
                   created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Deletes a user by ID; the user's tasks go with it (`ON DELETE CASCADE`)
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a refresh token, replacing whatever the slot held before
    pub async fn set_refresh_token(
        pool: &PgPool,
        id: Uuid,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the refresh token of whichever user currently holds `token`
    ///
    /// # Returns
    ///
    /// True if a user held the token
    pub async fn clear_refresh_token_matching(
        pool: &PgPool,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = NULL, updated_at = NOW()
            WHERE refresh_token = $1
            "#,
        )
        .bind(token)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a pending password reset
    pub async fn set_reset_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = $2,
                password_reset_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drops a pending password reset
    pub async fn clear_reset_token(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = NULL,
                password_reset_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Redeems a reset token: sets the new password hash if an unexpired
    /// reset with this token hash exists
    ///
    /// The match and the update are a single statement, so a token can only
    /// ever be redeemed once. The reset fields and the refresh token are
    /// cleared in the same update, which ends any existing session.
    ///
    /// # Returns
    ///
    /// The updated user, or None if no unexpired reset matched
    pub async fn reset_password_with_token(
        pool: &PgPool,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_reset_token_hash = NULL,
                password_reset_expires_at = NULL,
                refresh_token = NULL,
                updated_at = NOW()
            WHERE password_reset_token_hash = $1
              AND password_reset_expires_at > NOW()
            RETURNING id, name, email, password_hash, role, is_active, refresh_token,
                      password_reset_token_hash, password_reset_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(token_hash)
        .bind(password_hash)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Replaces the password hash and drops any pending reset
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_reset_token_hash = NULL,
                password_reset_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Edits name and/or role; `None` fields keep their value
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUserProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                role = COALESCE($3, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, is_active, refresh_token,
                      password_reset_token_hash, password_reset_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.role)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Sets the active flag; suspending also ends the user's session
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn set_active(
        pool: &PgPool,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = $2,
                refresh_token = CASE WHEN $2 THEN refresh_token ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, is_active, refresh_token,
                      password_reset_token_hash, password_reset_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Makes sure an administrator account exists for `email`
    ///
    /// Creates it when missing. An existing account with that email is
    /// promoted to admin and reactivated; its password is left alone.
    pub async fn ensure_admin(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, 'admin')
            ON CONFLICT (email) DO UPDATE
            SET role = 'admin', is_active = TRUE, updated_at = NOW()
            RETURNING id, name, email, password_hash, role, is_active, refresh_token,
                      password_reset_token_hash, password_reset_expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(normalize_email(email))
        .bind(password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Counts users that are not suspended
    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_active")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Counts users holding a role
    pub async fn count_by_role(pool: &PgPool, role: UserRole) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
