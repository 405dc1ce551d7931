use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::MethodFilter;
use axum::{http, Router};
use profile_database::basic_db::{InnerDatabase, SafeDatabase};
use profile_database::file_storage::LocalFileStorage;
use profile_service::{ProfileResource, ResourceSettings};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{Authenticator, Authorizer, RoleAuthorizer, StaticTokenAuthenticator};
use crate::config::Config;
use crate::pipeline::{guard, Capabilities};
use crate::profile::*;
use crate::router::*;
use crate::throttle::Throttle;

pub const API_PREFIX: &str = "/api/v1";

pub type Profiles = ProfileResource<InnerDatabase, LocalFileStorage>;

#[derive(Clone)]
pub struct AppState {
    pub resource: Arc<Profiles>,
    pub authenticator: Arc<dyn Authenticator>,
    pub authorizer: Arc<dyn Authorizer>,
    pub throttle: Throttle,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not open record store: {0}")]
    Database(#[from] libmdbx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        std::fs::create_dir_all(&config.database_path)?;
        std::fs::create_dir_all(&config.media.root)?;

        let database = InnerDatabase::open(&config.database_path)?;
        let storage = LocalFileStorage::new(&config.media.root, config.media_base_url());
        let settings = ResourceSettings {
            api_prefix: API_PREFIX.to_string(),
            default_limit: config.pagination.default_limit,
            max_limit: config.pagination.max_limit,
            inline_encoding: config.image.inline_encoding,
        };

        Ok(Self::new(ProfileResource::new(database, storage, settings), config))
    }

    pub fn new(resource: Profiles, config: &Config) -> Self {
        Self {
            resource: Arc::new(resource),
            authenticator: Arc::new(StaticTokenAuthenticator::new(&config.auth.tokens)),
            authorizer: Arc::new(RoleAuthorizer),
            throttle: Throttle::new(config.throttle.max_requests, config.throttle.window),
        }
    }
}

pub async fn build_server<F>(config: Config, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::from_config(&config)?;
    let app = build_app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), inline_encoding = config.image.inline_encoding, "serving user profiles");

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

pub fn build_app(state: AppState, config: &Config) -> Router {
    let components = collect_components(&state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::OPTIONS
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    let mut app = main_router(components, state);

    if config.media.serve {
        app = app.nest_service(config.media_url_path(), ServeDir::new(&config.media.root));
    }

    app.layer(DefaultBodyLimit::max(config.image.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}



fn collect_components(state: &AppState) -> Vec<(String, Router<AppState>)> {
    let list = format!("{API_PREFIX}/user_profiles/");
    let schema = format!("{API_PREFIX}/user_profiles/schema/");
    let detail = format!("{API_PREFIX}/user_profiles/{{id}}/");
    let image = format!("{API_PREFIX}/user_profiles/{{id}}/image/");

    let routes = vec![
        (route_builder(MethodFilter::GET, &list, list_profiles), Capabilities::read()),
        (route_builder(MethodFilter::POST, &list, create_profile), Capabilities::write()),
        (route_builder(MethodFilter::GET, &schema, profile_schema), Capabilities::read()),
        (route_builder(MethodFilter::GET, &detail, get_profile), Capabilities::read()),
        (route_builder(MethodFilter::PUT, &detail, put_profile), Capabilities::write()),
        (route_builder(MethodFilter::PATCH, &detail, patch_profile), Capabilities::write()),
        (route_builder(MethodFilter::DELETE, &detail, delete_profile), Capabilities::write()),
        (route_builder(MethodFilter::POST, &image, upload_image), Capabilities::write()),
    ];

    routes
        .into_iter()
        .map(|((path, router), capabilities)| (path, guard(router, capabilities, state)))
        .collect()
}
