/// Database models
///
/// - `user`: accounts, roles, refresh-token slot and password resets
/// - `task`: per-user to-do items
///
/// Each model exposes its queries as associated async functions taking a
/// `&PgPool`.
///
/// # Example
///
/// ```no_run
/// use taskdash_shared::models::task::Task;
/// use taskdash_shared::models::user::User;
/// use taskdash_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/taskdash", 5)).await?;
///
/// if let Some(user) = User::find_by_email(&pool, "ada@example.com").await? {
///     let tasks = Task::list_by_user(&pool, user.id).await?;
///     println!("{} has {} tasks", user.name, tasks.len());
/// }
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;
