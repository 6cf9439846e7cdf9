//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use legacyverse_api::{app::{build_router, AppState}, config::Config};
//! use legacyverse_shared::{
//!     clock::SystemClock,
//!     db::pool::{create_pool, DatabaseConfig},
//!     notify::LogNotifier,
//!     store::postgres::PgStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = create_pool(DatabaseConfig {
//!     url: config.database.url.clone(),
//!     ..Default::default()
//! })
//! .await?;
//! let state = AppState::new(
//!     Arc::new(PgStore::new(pool)),
//!     Arc::new(LogNotifier),
//!     Arc::new(SystemClock),
//!     config,
//! );
//!
//! let app = build_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use legacyverse_shared::{
    auth::middleware::{bearer_token, AuthContext},
    clock::Clock,
    identity::IdentityService,
    notify::Notifier,
    profile::ProfileService,
    store::{CredentialStore, ProfileStore},
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, Level};

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor; all fields
/// are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub profiles: Arc<ProfileService>,

    /// Store handle used by the health check
    pub store: Arc<dyn CredentialStore>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services over one store backend
    pub fn new<S>(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self
    where
        S: CredentialStore + ProfileStore + 'static,
    {
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let profiles: Arc<dyn ProfileStore> = store;

        let identity = IdentityService::new(
            credentials.clone(),
            notifier,
            clock,
            config.auth.identity_settings(),
        );
        let profile_service = ProfileService::new(profiles, credentials.clone());

        Self {
            identity: Arc::new(identity),
            profiles: Arc::new(profile_service),
            store: credentials,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1
///     ├── /auth
///     │   ├── POST /register, /login, /refresh
///     │   ├── POST /forgot-password, /reset-password
///     │   └── POST /logout, /logout-all, /change-password, GET /me (bearer)
///     └── /profile
///         ├── GET, PATCH /                                  (bearer)
///         ├── PUT, DELETE /image                            (bearer)
///         ├── GET, POST, DELETE /childhood-images           (bearer)
///         ├── PATCH, DELETE /childhood-images/:id           (bearer)
///         └── GET /:username
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/auth/reset-password", post(routes::auth::reset_password))
        .route("/profile/:username", get(routes::profile::get_public_profile));

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/logout-all", post(routes::auth::logout_all))
        .route("/auth/change-password", post(routes::auth::change_password))
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/profile",
            get(routes::profile::get_profile).patch(routes::profile::update_profile),
        )
        .route(
            "/profile/image",
            put(routes::profile::set_profile_image).delete(routes::profile::delete_profile_image),
        )
        .route(
            "/profile/childhood-images",
            get(routes::profile::list_childhood_images)
                .post(routes::profile::add_childhood_image)
                .delete(routes::profile::delete_all_childhood_images),
        )
        .route(
            "/profile/childhood-images/:id",
            patch(routes::profile::update_childhood_image)
                .delete(routes::profile::delete_childhood_image),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Verifies the bearer access token and injects [`AuthContext`]
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = {
        let token = bearer_token(req.headers())?;
        state.identity.tokens().verify_access(token)?
    };

    debug!(
        user_id = %claims.sub,
        jti = %claims.jti,
        expires_at = %claims.expires_at(),
        "Access token verified"
    );
    req.extensions_mut().insert(AuthContext::from_claims(&claims));

    Ok(next.run(req).await)
}
