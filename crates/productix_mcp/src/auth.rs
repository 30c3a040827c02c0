//! Bearer-token authentication for the multi-tenant HTTP mode.
//!
//! Tokens are HS256 JWTs carrying the caller's organization and role.
//! Every HTTP data route resolves its tenant from these claims; nothing in a
//! request body or path can widen the scope.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use jwt_simple::prelude::{Claims, Duration as JwtDuration, HS256Key, MACLike};
use productix_core::OrgId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::McpError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdmin,
    OrgAdmin,
    OrgUser,
}

impl Role {
    /// Catalog changes (creating products) are limited to administrators.
    pub fn can_manage_products(self) -> bool {
        matches!(self, Role::SystemAdmin | Role::OrgAdmin)
    }
}

/// Custom JWT claims identifying the tenant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantClaims {
    pub org_id: OrgId,
    pub role: Role,
}

impl TenantClaims {
    pub fn new(org_id: OrgId, role: Role) -> Self {
        Self { org_id, role }
    }

    pub fn require_product_admin(&self) -> Result<(), McpError> {
        if self.role.can_manage_products() {
            Ok(())
        } else {
            Err(McpError::Forbidden(
                "creating products requires an organization admin".into(),
            ))
        }
    }
}

/// Signing and verification key shared by token issuers and the server.
#[derive(Clone)]
pub struct TokenKey {
    key: HS256Key,
}

impl TokenKey {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: HS256Key::from_bytes(secret.expose_secret().as_bytes()),
        }
    }

    pub fn issue(&self, claims: TenantClaims, valid_for_hours: u64) -> Result<String, McpError> {
        let claims = Claims::with_custom_claims(claims, JwtDuration::from_hours(valid_for_hours));
        self.key
            .authenticate(claims)
            .map_err(|e| McpError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<TenantClaims, McpError> {
        self.key
            .verify_token::<TenantClaims>(token, None)
            .map(|claims| claims.custom)
            .map_err(|e| McpError::Unauthorized(format!("invalid token: {e}")))
    }

    /// Verify the `Authorization: Bearer <token>` header.
    pub fn authenticate_headers(&self, headers: &HeaderMap) -> Result<TenantClaims, McpError> {
        let token = bearer_token(headers)?;
        self.verify(token)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, McpError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| McpError::Unauthorized("missing bearer token".into()))?
        .to_str()
        .map_err(|_| McpError::Unauthorized("authorization header is not valid ASCII".into()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| McpError::Unauthorized("expected a bearer token".into()))
}
