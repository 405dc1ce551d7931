//! Authentication and authorization seams.
//!
//! Token validation is delegated to an [`Authenticator`]; the bundled
//! [`StaticTokenAuthenticator`] resolves bearer tokens issued elsewhere (an
//! OAuth2 provider) from configuration. Role checks go through an
//! [`Authorizer`].

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::config::TokenGrant;
use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
}

/// Who is calling, as established by the authenticator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub roles: Vec<Role>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ApiError>;
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, principal: &Principal, access: Access) -> bool;
}

pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenAuthenticator {
    pub fn new<'a>(grants: impl IntoIterator<Item = &'a TokenGrant>) -> Self {
        let tokens = grants
            .into_iter()
            .map(|grant| {
                let principal = Principal {
                    subject: grant.subject.clone(),
                    roles: grant.roles.clone(),
                };
                (grant.token.clone(), principal)
            })
            .collect();

        Self { tokens }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;

        self.tokens.get(token).cloned().ok_or_else(|| {
            tracing::debug!("rejected unknown bearer token");
            ApiError::Unauthenticated
        })
    }
}

/// Viewers read, editors read and write.
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn authorize(&self, principal: &Principal, access: Access) -> bool {
        principal.roles.iter().any(|role| match access {
            Access::Read => matches!(role, Role::Viewer | Role::Editor),
            Access::Write => matches!(role, Role::Editor),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    (scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty()).then(|| token.trim())
}
