/// HTTP client for the TaskDash API
///
/// Attaches the session's access token to every request. When a protected
/// call comes back 401 the client asks `/api/auth/refresh` for a new access
/// token (the refresh cookie rides along in the cookie jar) and retries the
/// call exactly once. If the refresh fails, or the retry is refused again, the
/// session is cleared and [`ClientError::SessionExpired`] is returned: the
/// caller should show the login page.
///
/// # Example
///
/// ```no_run
/// use taskdash_client::{ApiClient, Session};
///
/// # async fn example() -> Result<(), taskdash_client::ClientError> {
/// let session = Session::new();
/// let client = ApiClient::new("http://localhost:7005", session.clone())?;
///
/// client.login("ada@example.com", "secret1").await?;
/// let tasks = client.list_tasks().await?;
/// println!("{} tasks for {:?}", tasks.len(), session.user());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use reqwest::{Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{ClientError, ClientResult},
    session::{Session, SessionUser},
};

/// Task priority as exchanged with the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub priority: Priority,
    pub due: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New task; omitted fields take the server defaults
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
}

/// Partial task edit; at least one field must be set
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.priority.is_none() && self.due.is_none() && self.completed.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

/// TaskDash API client bound to one [`Session`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
}

impl ApiClient {
    /// Creates a client with its own cookie jar
    pub fn new(base_url: &str, session: Session) -> ClientResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http = reqwest::Client::builder().cookie_store(true).build()?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Creates an account; does not sign in
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ClientResult<String> {
        let response = self
            .execute(
                Method::POST,
                "/api/auth/register",
                Some(&json!({ "name": name, "email": email, "password": password })),
                false,
            )
            .await?;

        Ok(decode::<MessageBody>(response).await?.message)
    }

    /// Signs in and stores the access token and user in the session
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<SessionUser> {
        let response = self
            .execute(
                Method::POST,
                "/api/auth/login",
                Some(&json!({ "email": email, "password": password })),
                false,
            )
            .await?;

        let login: LoginResponse = decode(response).await?;
        self.session.sign_in(login.access_token, login.user.clone());

        tracing::debug!(user_id = %login.user.id, "Signed in");
        Ok(login.user)
    }

    /// Exchanges the refresh cookie for a new access token
    pub async fn refresh(&self) -> ClientResult<String> {
        let response = self.execute(Method::POST, "/api/auth/refresh", None, false).await?;
        let refreshed: RefreshResponse = decode(response).await?;

        self.session.replace_access_token(refreshed.access_token.clone());
        Ok(refreshed.access_token)
    }

    /// Signs out on the server and always clears the local session
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.execute(Method::POST, "/api/auth/logout", None, false).await;
        self.session.clear();

        decode::<MessageBody>(result?).await.map(|_| ())
    }

    pub async fn forgot_password(&self, email: &str) -> ClientResult<String> {
        let response = self
            .execute(
                Method::POST,
                "/api/auth/forgot-password",
                Some(&json!({ "email": email })),
                false,
            )
            .await?;

        Ok(decode::<MessageBody>(response).await?.message)
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> ClientResult<String> {
        let response = self
            .execute(
                Method::PATCH,
                &format!("/api/auth/reset-password/{}", token),
                Some(&json!({ "password": password })),
                false,
            )
            .await?;

        Ok(decode::<MessageBody>(response).await?.message)
    }

    pub async fn list_tasks(&self) -> ClientResult<Vec<Task>> {
        self.request(Method::GET, "/api/tasks", None).await
    }

    pub async fn create_task(&self, task: &NewTask) -> ClientResult<Task> {
        self.request(Method::POST, "/api/tasks", Some(serde_json::to_value(task)?))
            .await
    }

    /// Flips the completion flag
    pub async fn toggle_task(&self, id: Uuid) -> ClientResult<Task> {
        self.request(Method::PATCH, &format!("/api/tasks/{}", id), None)
            .await
    }

    /// Applies a partial edit; use [`ApiClient::toggle_task`] to flip completion
    pub async fn update_task(&self, id: Uuid, changes: &TaskChanges) -> ClientResult<Task> {
        if changes.is_empty() {
            return Err(ClientError::EmptyUpdate);
        }

        self.request(
            Method::PATCH,
            &format!("/api/tasks/{}", id),
            Some(serde_json::to_value(changes)?),
        )
        .await
    }

    pub async fn delete_task(&self, id: Uuid) -> ClientResult<()> {
        self.request::<Value>(Method::DELETE, &format!("/api/tasks/{}", id), None)
            .await
            .map(|_| ())
    }

    /// Role-specific dashboard payload
    pub async fn dashboard(&self) -> ClientResult<Value> {
        self.request(Method::GET, "/api/dashboard", None).await
    }

    /// Admin user list
    pub async fn list_users(&self) -> ClientResult<Value> {
        self.request(Method::GET, "/api/users", None).await
    }

    /// Protected call with one refresh-and-retry on 401
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<T> {
        let response = self.execute(method.clone(), path, body.as_ref(), true).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }

        tracing::debug!(path, "Access token refused, refreshing");

        if let Err(e) = self.refresh().await {
            tracing::info!(error = %e, "Refresh failed, signing out");
            self.session.clear();
            return Err(ClientError::SessionExpired);
        }

        let retried = self.execute(method, path, body.as_ref(), true).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(path, "Retry refused after refresh, signing out");
            self.session.clear();
            return Err(ClientError::SessionExpired);
        }

        decode(retried).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        with_token: bool,
    ) -> ClientResult<Response> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))?;

        let mut builder = self.http.request(method, url);

        if with_token {
            if let Some(token) = self.session.access_token() {
                builder = builder.bearer_auth(token);
            }
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = match response.json::<MessageBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };

    Err(ClientError::Api { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url", Session::new()),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_new_task_omits_defaults() {
        let json = serde_json::to_value(NewTask {
            title: "t1".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json, json!({ "title": "t1" }));
    }

    #[tokio::test]
    async fn test_empty_changes_are_not_sent() {
        // Nothing listens on the discard port; the call must fail before any I/O
        let client = ApiClient::new("http://127.0.0.1:9", Session::new()).unwrap();

        let err = client
            .update_task(Uuid::new_v4(), &TaskChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::EmptyUpdate));
    }

    #[test]
    fn test_task_changes_wire_format() {
        let json = serde_json::to_value(TaskChanges {
            priority: Some(Priority::High),
            completed: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json, json!({ "priority": "High", "completed": true }));
    }
}
