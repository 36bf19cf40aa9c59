//! # TaskDash API Server Library
//!
//! HTTP backend for the TaskDash dashboard: accounts and sessions, user
//! administration, per-user tasks and a role-aware dashboard.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validating JSON extractor
//! - `mail`: Outgoing mail (SMTP or log)
//! - `middleware`: Session, role gate and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod routes;
