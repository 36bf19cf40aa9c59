//! # TaskDash Client
//!
//! Typed client for the TaskDash API with an explicit [`Session`]:
//! bearer attachment, one transparent refresh-and-retry on 401, forced
//! sign-out when that fails, and a route guard for role-specific views.

pub mod client;
pub mod error;
pub mod session;

pub use client::{ApiClient, NewTask, Priority, Task, TaskChanges};
pub use error::{ClientError, ClientResult};
pub use session::{Navigation, Role, Route, Session, SessionUser};
