//! Per-route request pipeline.
//!
//! Each route declares the [`Capabilities`] it needs and [`guard`] wraps it in
//! the matching middleware, which runs in the order
//! authenticate → throttle → authorize → handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::Router;

use crate::auth::{Access, Authorizer, Principal};
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub authenticate: bool,
    pub throttle: bool,
    pub access: Option<Access>,
}

impl Capabilities {
    pub const fn read() -> Self {
        Self { authenticate: true, throttle: true, access: Some(Access::Read) }
    }

    pub const fn write() -> Self {
        Self { authenticate: true, throttle: true, access: Some(Access::Write) }
    }
}

#[derive(Clone)]
struct AuthorizeState {
    authorizer: Arc<dyn Authorizer>,
    access: Access,
}

pub fn guard(router: Router<AppState>, capabilities: Capabilities, state: &AppState) -> Router<AppState> {
    let mut router = router;

    // route_layer wraps from the inside out, so the first check is added last
    if let Some(access) = capabilities.access {
        let authorize_state = AuthorizeState {
            authorizer: Arc::clone(&state.authorizer),
            access,
        };
        router = router.route_layer(from_fn_with_state(authorize_state, authorize));
    }
    if capabilities.throttle {
        router = router.route_layer(from_fn_with_state(state.clone(), throttle));
    }
    if capabilities.authenticate {
        router = router.route_layer(from_fn_with_state(state.clone(), authenticate));
    }

    router
}

async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = state.authenticator.authenticate(request.headers()).await?;
    tracing::trace!(subject = %principal.subject, "authenticated");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

async fn throttle(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = request
        .extensions()
        .get::<Principal>()
        .map(|principal| principal.subject.as_str())
        .unwrap_or("anonymous");

    state
        .throttle
        .check(key)
        .map_err(|retry_after| ApiError::Throttled { retry_after })?;

    Ok(next.run(request).await)
}

async fn authorize(
    State(state): State<AuthorizeState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or(ApiError::Unauthenticated)?;

    if !state.authorizer.authorize(principal, state.access) {
        return Err(ApiError::Forbidden { access: state.access });
    }

    Ok(next.run(request).await)
}
