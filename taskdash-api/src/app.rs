/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdash_api::{app::AppState, config::Config, mail::LogMailer};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let mailer = Arc::new(LogMailer::new(config.mail.from.clone()));
/// let state = AppState::new(pool, config, mailer);
/// let app = taskdash_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{ErrorResponse, InternalErrorDetail, INTERNAL_ERROR_MESSAGE},
    mail::Mailer,
    middleware::{
        security::SecurityHeadersLayer,
        session::{require_session, role_gate, ADMIN_ONLY, ANY_ROLE},
    },
    routes::{auth, dashboard, health, tasks, users},
};
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskdash_shared::{
    auth::{jwt::JwtSettings, password::hash_password},
    models::user::User,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token issuer settings, derived once from `config.jwt`
    pub jwt: Arc<JwtSettings>,

    /// Outgoing mail
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let jwt = Arc::new(config.jwt_settings());

        Self {
            db,
            config: Arc::new(config),
            jwt,
            mailer,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /                                 # {"message": "API is running"}
/// /health                           # Health check
/// /api/auth/                        # Public
/// │   ├── POST  /register
/// │   ├── POST  /login
/// │   ├── POST  /refresh            # refreshToken cookie
/// │   ├── POST  /logout
/// │   ├── POST  /forgot-password
/// │   └── PATCH /reset-password/:token
/// /api/users/                       # Session required
/// │   ├── GET    /                  # admin
/// │   ├── POST   /                  # admin
/// │   ├── PATCH  /update-name
/// │   ├── PATCH  /update-password
/// │   ├── GET    /:id               # admin or self
/// │   ├── PATCH  /:id               # admin
/// │   ├── DELETE /:id               # admin
/// │   └── PATCH  /:id/status        # admin
/// /api/tasks/                       # Session required, caller's tasks only
/// │   ├── GET    /
/// │   ├── POST   /
/// │   ├── PATCH  /:id
/// │   └── DELETE /:id
/// /api/dashboard                    # Session required, payload per role
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, then (outside
/// production) the 500 detail rewriter. Session and role checks are route
/// layers, so unknown paths fall through to the JSON 404.
pub fn build_router(state: AppState) -> Router {
    let session = middleware::from_fn_with_state(state.clone(), require_session);
    let admin_only = middleware::from_fn(role_gate(ADMIN_ONLY));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/:token", patch(auth::reset_password));

    let user_routes = Router::new()
        .route(
            "/",
            get(users::list_users)
                .post(users::create_user)
                .route_layer(admin_only.clone()),
        )
        .route("/update-name", patch(users::update_name))
        .route("/update-password", patch(users::update_password))
        .route(
            "/:id",
            get(users::get_user).merge(
                patch(users::update_user)
                    .delete(users::delete_user)
                    .route_layer(admin_only.clone()),
            ),
        )
        .route(
            "/:id/status",
            patch(users::toggle_status).route_layer(admin_only),
        )
        .route_layer(session.clone());

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/:id", patch(tasks::update_task).delete(tasks::delete_task))
        .route_layer(session.clone());

    let dashboard_routes = Router::new()
        .route("/", get(dashboard::dashboard))
        .route_layer(middleware::from_fn(role_gate(ANY_ROLE)))
        .route_layer(session);

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .nest("/dashboard", dashboard_routes);

    let mut router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .fallback(health::not_found);

    if !state.config.is_production() {
        router = router.layer(middleware::from_fn(expose_error_detail));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.is_production()))
        .with_state(state)
}

/// CORS: permissive when no origins are configured, otherwise the listed
/// origins with credentials so the refresh cookie is sent cross-origin
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Copies the internal message of a 500 into its body (development only)
async fn expose_error_detail(req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>().cloned()
    else {
        return response;
    };

    let body = ErrorResponse {
        error: "internal_error".to_string(),
        message: INTERNAL_ERROR_MESSAGE.to_string(),
        details: None,
        detail: Some(detail),
    };

    let bytes = match serde_json::to_vec(&body) {
        Ok(bytes) => bytes,
        Err(_) => return response,
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

/// Makes sure the configured bootstrap administrator exists and is active
///
/// Does nothing when no bootstrap admin is configured. An existing account
/// with that email is promoted; its password is left alone.
pub async fn ensure_bootstrap_admin(pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    let Some(admin) = &config.bootstrap_admin else {
        return Ok(());
    };

    let password_hash = hash_password(&admin.password)
        .map_err(|e| anyhow::anyhow!("Failed to hash bootstrap admin password: {}", e))?;
    let user = User::ensure_admin(pool, &admin.name, &admin.email, &password_hash).await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ApiError, mail::LogMailer};
    use axum::{body::to_bytes, http::StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_config(cors: Option<&'static str>) -> Config {
        Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgresql://localhost:1/taskdash".to_string()),
            "JWT_SECRET" => Some("access-secret-at-least-32-bytes-long!".to_string()),
            "REFRESH_SECRET" => Some("refresh-secret-at-least-32-bytes-long".to_string()),
            "CORS_ORIGINS" => cors.map(str::to_string),
            _ => None,
        })
        .unwrap()
    }

    fn test_state() -> AppState {
        let config = test_config(None);
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();
        let mailer = Arc::new(LogMailer::new(config.mail.from.clone()));
        AppState::new(pool, config, mailer)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_root_route() {
        let response = build_router(test_state()).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "API is running");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = build_router(test_state()).oneshot(get("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Route not found");
        assert_eq!(json["path"], "/api/nope");
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_token() {
        for uri in ["/api/tasks", "/api/users", "/api/dashboard"] {
            let response = build_router(test_state()).oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/refresh")
            .body(Body::empty())
            .unwrap();

        let response = build_router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Not authenticated");
    }

    #[tokio::test]
    async fn test_error_detail_exposed_in_development() {
        let app = Router::new()
            .route(
                "/boom",
                axum::routing::get(|| async {
                    Err::<(), _>(ApiError::InternalError("pool exhausted".to_string()))
                }),
            )
            .layer(middleware::from_fn(expose_error_detail));

        let response = app.oneshot(get("/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], INTERNAL_ERROR_MESSAGE);
        assert_eq!(json["detail"], "pool exhausted");
    }

    #[tokio::test]
    async fn test_error_detail_hidden_without_rewriter() {
        let app: Router = Router::new().route(
            "/boom",
            axum::routing::get(|| async {
                Err::<(), _>(ApiError::InternalError("pool exhausted".to_string()))
            }),
        );

        let json = body_json(app.oneshot(get("/boom")).await.unwrap()).await;
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_cors_layer_with_origins() {
        // Construction must not panic: credentials with explicit origins is allowed
        let _ = cors_layer(&test_config(Some("http://localhost:5173")));
        let _ = cors_layer(&test_config(None));
    }
}
