use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName};

use crate::error::AdminError;

pub const DEFAULT_ELEVATED_ROLE: &str = "SUPER_ADMIN";
pub const DEFAULT_USER_HEADER: &str = "x-session-user";
pub const DEFAULT_ROLE_HEADER: &str = "x-session-role";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: Option<String>,
    pub role: String,
}

/// Turns request metadata into the caller's session, if any. Authentication
/// itself happens upstream of this service.
pub trait SessionResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<Session>;
}

/// Reads the identity headers a fronting auth proxy attaches to every request.
#[derive(Clone, Debug)]
pub struct HeaderSessionResolver {
    user_header: HeaderName,
    role_header: HeaderName,
}

impl HeaderSessionResolver {
    pub fn new(user_header: &str, role_header: &str) -> Result<Self, AdminError> {
        let parse = |name: &str| {
            HeaderName::try_from(name.trim().to_ascii_lowercase())
                .map_err(|err| AdminError::Validation(format!("invalid header name '{name}': {err}")))
        };
        Ok(Self {
            user_header: parse(user_header)?,
            role_header: parse(role_header)?,
        })
    }
}

impl Default for HeaderSessionResolver {
    fn default() -> Self {
        Self {
            user_header: HeaderName::from_static(DEFAULT_USER_HEADER),
            role_header: HeaderName::from_static(DEFAULT_ROLE_HEADER),
        }
    }
}

impl SessionResolver for HeaderSessionResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<Session> {
        let role = header_text(headers, &self.role_header)?;
        Some(Session {
            user: header_text(headers, &self.user_header),
            role,
        })
    }
}

fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Admits only callers whose session carries the elevated role.
#[derive(Clone)]
pub struct AccessGuard {
    elevated_role: String,
    resolver: Arc<dyn SessionResolver>,
}

impl AccessGuard {
    pub fn new(elevated_role: impl Into<String>, resolver: Arc<dyn SessionResolver>) -> Self {
        Self {
            elevated_role: elevated_role.into(),
            resolver,
        }
    }

    pub fn elevated_role(&self) -> &str {
        &self.elevated_role
    }

    pub fn authorize(&self, headers: &HeaderMap) -> Result<Session, AdminError> {
        match self.resolver.resolve(headers) {
            Some(session) if session.role == self.elevated_role => Ok(session),
            _ => Err(AdminError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn guard() -> AccessGuard {
        AccessGuard::new(
            DEFAULT_ELEVATED_ROLE,
            Arc::new(HeaderSessionResolver::default()),
        )
    }

    #[test]
    fn missing_session_is_rejected() {
        let err = guard()
            .authorize(&HeaderMap::new())
            .expect_err("no session should be rejected");
        assert!(matches!(err, AdminError::Unauthorized));
    }

    #[test]
    fn other_roles_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(DEFAULT_ROLE_HEADER, HeaderValue::from_static("ADMIN"));
        assert!(guard().authorize(&headers).is_err());
    }

    #[test]
    fn elevated_role_is_admitted_with_user() {
        let mut headers = HeaderMap::new();
        headers.insert(DEFAULT_ROLE_HEADER, HeaderValue::from_static("SUPER_ADMIN"));
        headers.insert(DEFAULT_USER_HEADER, HeaderValue::from_static("ops@example.com"));
        let session = guard().authorize(&headers).expect("session should pass");
        assert_eq!(session.user.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn custom_header_names_are_honoured() {
        let resolver = HeaderSessionResolver::new("X-Auth-User", "X-Auth-Role")
            .expect("header names should be valid");
        let mut headers = HeaderMap::new();
        headers.insert("x-auth-role", HeaderValue::from_static("SUPER_ADMIN"));
        let guard = AccessGuard::new("SUPER_ADMIN", Arc::new(resolver));
        assert!(guard.authorize(&headers).is_ok());
        assert!(HeaderSessionResolver::new("bad header", "x").is_err());
    }
}
