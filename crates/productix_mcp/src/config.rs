//! Server settings read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use productix_core::OrgId;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use crate::error::McpError;

pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STDIO_ORG_ID: OrgId = 1;
/// Per-target overrides appended to every filter to keep rmcp internals quiet.
pub const QUIET_TARGETS: &str = "rmcp=warn,serve_inner=warn";
pub const DEFAULT_LOG_FILTER: &str = "info,rmcp=warn,serve_inner=warn";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub jwt_secret: SecretString,
    pub address: SocketAddr,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    /// Organization served by the `/mcp` endpoint; unset disables it.
    pub mcp_org_id: Option<OrgId>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, McpError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Result<Self, McpError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let secret = get("PRODUCTIX_JWT_SECRET")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| McpError::Validation("PRODUCTIX_JWT_SECRET must be set".into()))?;
        let address = get("ADDRESS")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)));
        let max_body_bytes = get("MAX_HTTP_BODY_SIZE")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);
        let timeout_secs = get("PRODUCTIX_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let mcp_org_id = match get("PRODUCTIX_MCP_ORG_ID") {
            Some(raw) => Some(parse_org_id("PRODUCTIX_MCP_ORG_ID", &raw)?),
            None => None,
        };
        Ok(Self {
            jwt_secret: SecretString::new(secret.into()),
            address,
            max_body_bytes,
            request_timeout: Duration::from_secs(timeout_secs),
            mcp_org_id,
        })
    }
}

/// Organization served by the stdio server (`PRODUCTIX_ORG_ID`, default 1).
pub fn stdio_org_id_with<F>(mut get: F) -> Result<OrgId, McpError>
where
    F: FnMut(&str) -> Option<String>,
{
    match get("PRODUCTIX_ORG_ID") {
        Some(raw) => parse_org_id("PRODUCTIX_ORG_ID", &raw),
        None => Ok(DEFAULT_STDIO_ORG_ID),
    }
}

/// Log directives from `PRODUCTIX_LOG_LEVEL`, else `RUST_LOG`, else `info`.
pub fn log_filter_with<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let set = |v: &String| !v.trim().is_empty();
    let level = get("PRODUCTIX_LOG_LEVEL")
        .filter(set)
        .or_else(|| get("RUST_LOG").filter(set))
        .unwrap_or_else(|| "info".into());
    format!("{level},{QUIET_TARGETS}")
}

/// Malformed directives fall back to [`DEFAULT_LOG_FILTER`].
pub fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn parse_org_id(var: &str, raw: &str) -> Result<OrgId, McpError> {
    raw.trim()
        .parse::<OrgId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| McpError::Validation(format!("{var} must be a positive integer, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_required() {
        let res = ServerConfig::from_env_with(|_| None);
        assert!(matches!(res, Err(McpError::Validation(_))));
    }

    #[test]
    fn defaults_apply() {
        let cfg = ServerConfig::from_env_with(|k| match k {
            "PRODUCTIX_JWT_SECRET" => Some("s".into()),
            _ => None,
        })
        .expect("cfg");
        assert_eq!(cfg.address, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(cfg.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert!(cfg.mcp_org_id.is_none());
    }

    #[test]
    fn reads_overrides() {
        let cfg = ServerConfig::from_env_with(|k| match k {
            "PRODUCTIX_JWT_SECRET" => Some("s".into()),
            "ADDRESS" => Some("0.0.0.0:8080".into()),
            "MAX_HTTP_BODY_SIZE" => Some("1024".into()),
            "PRODUCTIX_REQUEST_TIMEOUT_SECS" => Some("5".into()),
            "PRODUCTIX_MCP_ORG_ID" => Some("12".into()),
            _ => None,
        })
        .expect("cfg");
        assert_eq!(cfg.address.port(), 8080);
        assert_eq!(cfg.max_body_bytes, 1024);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert_eq!(cfg.mcp_org_id, Some(12));
    }

    #[test]
    fn org_id_must_be_positive() {
        assert_eq!(stdio_org_id_with(|_| None).expect("default"), 1);
        assert!(stdio_org_id_with(|_| Some("0".into())).is_err());
        assert!(stdio_org_id_with(|_| Some("abc".into())).is_err());
        assert_eq!(stdio_org_id_with(|_| Some(" 4 ".into())).expect("org"), 4);
    }
}
