/// API route handlers, organized by resource:
///
/// - `health`: liveness, health check and the JSON 404
/// - `auth`: register, login, refresh, logout, forgot/reset password
/// - `users`: administration and self-service profile updates
/// - `tasks`: the caller's own task list
/// - `dashboard`: role-specific summary

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod tasks;
pub mod users;
