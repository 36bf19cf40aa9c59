/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Models and their queries are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
