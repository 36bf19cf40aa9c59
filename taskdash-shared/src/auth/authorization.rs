/// Role gate and permission checks
///
/// # Permission Model
///
/// Two roles, `member` and `admin`, and a closed set of [`Permission`]s. Each
/// role maps to the permissions it holds through [`UserRole::can`]; route
/// groups are gated either by an explicit list of allowed roles
/// ([`require_role`]) or by a permission ([`require_permission`]).
///
/// Administrative actions on another account go through
/// [`ensure_can_moderate`], which forbids acting on yourself and on peers.
///
/// # Example
///
/// ```
/// use taskdash_shared::auth::authorization::{require_permission, require_role, Permission};
/// use taskdash_shared::auth::middleware::AuthContext;
/// use taskdash_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let admin = AuthContext {
///     user_id: Uuid::new_v4(),
///     name: "Root".to_string(),
///     email: "root@example.com".to_string(),
///     role: UserRole::Admin,
/// };
///
/// assert!(require_role(&admin, &[UserRole::Admin]).is_ok());
/// assert!(require_permission(&admin, Permission::ManageUsers).is_ok());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    /// Caller's role is not in the allowed set
    #[error("Access denied: insufficient permissions")]
    InsufficientRole { actual: UserRole },

    /// Caller tried an administrative action on their own account
    #[error("You cannot perform this action on your own account")]
    SelfAction,

    /// Caller tried an administrative action on another administrator
    #[error("Administrators cannot modify other administrators")]
    PeerAdmin,
}

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Create, edit, suspend and delete other accounts
    ManageUsers,

    /// List and read any account
    ViewAllUsers,

    /// Work with the caller's own task list
    ManageOwnTasks,

    /// See the system-wide dashboard summary
    ViewAdminDashboard,
}

/// Checks the caller's role against an allow-list
///
/// # Errors
///
/// Returns `AuthzError::InsufficientRole` if the role is not listed
pub fn require_role(auth: &AuthContext, allowed: &[UserRole]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.role) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole { actual: auth.role })
    }
}

/// Checks that the caller's role grants a permission
pub fn require_permission(auth: &AuthContext, permission: Permission) -> Result<(), AuthzError> {
    if auth.role.can(permission) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole { actual: auth.role })
    }
}

/// Allows reading an account when the caller is that account or may view all users
pub fn require_self_or_permission(
    auth: &AuthContext,
    target_id: Uuid,
    permission: Permission,
) -> Result<(), AuthzError> {
    if auth.owns(target_id) {
        return Ok(());
    }

    require_permission(auth, permission)
}

/// Checks that an administrator may act on a target account
///
/// Self-targeting is refused first, then peers: an administrator can never
/// suspend, delete or edit another administrator.
pub fn ensure_can_moderate(
    actor: &AuthContext,
    target_id: Uuid,
    target_role: UserRole,
) -> Result<(), AuthzError> {
    require_permission(actor, Permission::ManageUsers)?;

    if actor.user_id == target_id {
        return Err(AuthzError::SelfAction);
    }

    if target_role == UserRole::Admin {
        return Err(AuthzError::PeerAdmin);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_require_role() {
        let admin = context(UserRole::Admin);
        let member = context(UserRole::Member);

        assert!(require_role(&admin, &[UserRole::Admin]).is_ok());
        assert!(require_role(&member, &[UserRole::Admin, UserRole::Member]).is_ok());
        assert_eq!(
            require_role(&member, &[UserRole::Admin]),
            Err(AuthzError::InsufficientRole {
                actual: UserRole::Member
            })
        );
        assert!(require_role(&admin, &[]).is_err());
    }

    #[test]
    fn test_require_permission() {
        let admin = context(UserRole::Admin);
        let member = context(UserRole::Member);

        assert!(require_permission(&admin, Permission::ManageUsers).is_ok());
        assert!(require_permission(&admin, Permission::ViewAdminDashboard).is_ok());
        assert!(require_permission(&member, Permission::ManageOwnTasks).is_ok());
        assert!(require_permission(&member, Permission::ManageUsers).is_err());
        assert!(require_permission(&member, Permission::ViewAllUsers).is_err());
    }

    #[test]
    fn test_require_self_or_permission() {
        let member = context(UserRole::Member);
        let admin = context(UserRole::Admin);
        let other = Uuid::new_v4();

        assert!(require_self_or_permission(&member, member.user_id, Permission::ViewAllUsers).is_ok());
        assert!(require_self_or_permission(&member, other, Permission::ViewAllUsers).is_err());
        assert!(require_self_or_permission(&admin, other, Permission::ViewAllUsers).is_ok());
    }

    #[test]
    fn test_ensure_can_moderate() {
        let admin = context(UserRole::Admin);

        assert!(ensure_can_moderate(&admin, Uuid::new_v4(), UserRole::Member).is_ok());
        assert_eq!(
            ensure_can_moderate(&admin, admin.user_id, UserRole::Admin),
            Err(AuthzError::SelfAction)
        );
        assert_eq!(
            ensure_can_moderate(&admin, Uuid::new_v4(), UserRole::Admin),
            Err(AuthzError::PeerAdmin)
        );

        let member = context(UserRole::Member);
        assert!(matches!(
            ensure_can_moderate(&member, Uuid::new_v4(), UserRole::Member),
            Err(AuthzError::InsufficientRole { .. })
        ));
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::InsufficientRole {
            actual: UserRole::Member,
        };
        assert_eq!(err.to_string(), "Access denied: insufficient permissions");
        assert!(AuthzError::PeerAdmin.to_string().contains("other administrators"));
    }
}
