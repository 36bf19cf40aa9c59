/// Middleware for the API server
///
/// - `security`: security response headers
/// - `session`: bearer-token session check and the role gate

pub mod security;
pub mod session;
