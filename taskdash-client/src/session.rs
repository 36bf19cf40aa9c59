/// Client-side session
///
/// A [`Session`] holds the access token and the signed-in user. It is an
/// explicit value handed to the [`ApiClient`](crate::client::ApiClient) (and to
/// whatever renders views), not ambient global state. Clones share the same
/// underlying slot, so a refresh performed by the client is visible to every
/// holder.
///
/// The refresh token is never stored here: it lives in the HTTP cookie jar of
/// the client, the way an HttpOnly cookie lives in a browser.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Account role as the API reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

/// Identity returned by login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
struct SignedIn {
    access_token: String,
    user: SessionUser,
}

/// Shared, explicitly passed session state
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<Option<SignedIn>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the result of a successful login
    pub fn sign_in(&self, access_token: impl Into<String>, user: SessionUser) {
        *self.write() = Some(SignedIn {
            access_token: access_token.into(),
            user,
        });
    }

    /// Replaces the access token after a refresh; ignored when signed out
    pub fn replace_access_token(&self, access_token: impl Into<String>) {
        if let Some(signed_in) = self.write().as_mut() {
            signed_in.access_token = access_token.into();
        }
    }

    /// Forgets token and user
    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.access_token.clone())
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.read()
            .as_ref()
            .map_or(false, |s| s.user.role == Role::Admin)
    }

    /// Decides whether a view may be shown
    ///
    /// Signed-out users are sent to the login page; members asking for an
    /// admin view are sent back to the dashboard.
    pub fn guard(&self, route: Route) -> Navigation {
        match route.access() {
            Access::Public => Navigation::Allow,
            Access::SignedIn if self.is_authenticated() => Navigation::Allow,
            Access::Admin if self.is_admin() => Navigation::Allow,
            Access::Admin if self.is_authenticated() => Navigation::Redirect(Route::Dashboard),
            Access::SignedIn | Access::Admin => Navigation::Redirect(Route::Login),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<SignedIn>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<SignedIn>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Views of the dashboard front end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    Dashboard,
    Tasks,
    Profile,
    Users,
    Analytics,
}

/// Who may see a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    SignedIn,
    Admin,
}

/// Outcome of [`Session::guard`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(Route),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetPassword => "/reset-password",
            Route::Dashboard => "/dashboard",
            Route::Tasks => "/dashboard/tasks",
            Route::Profile => "/dashboard/profile",
            Route::Users => "/dashboard/users",
            Route::Analytics => "/dashboard/analytics",
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Register | Route::ForgotPassword | Route::ResetPassword => {
                Access::Public
            }
            Route::Dashboard | Route::Tasks | Route::Profile => Access::SignedIn,
            Route::Users | Route::Analytics => Access::Admin,
        }
    }
}
