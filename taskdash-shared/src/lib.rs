//! # taskdash shared library
//!
//! Domain types, database access and auth primitives used by the API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, tasks) and their queries
//! - `auth`: Token issuing, password hashing, reset tokens, session context, role gate
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the taskdash shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
