use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{Claims, TokenError, TokenVerifier};
use crate::error::ApiError;

/// Identity of a caller that passed the role gate.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject: Option<String>,
    pub roles: Vec<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            roles: claims.roles,
        }
    }
}

/// Why a request was turned away. Only `MissingRole` is distinguishable by the caller.
#[derive(Debug)]
pub enum Denial {
    MissingCredential,
    InvalidToken(TokenError),
    MissingRole,
}

impl Denial {
    pub fn kind(&self) -> &'static str {
        match self {
            Denial::MissingCredential => "missing_credential",
            Denial::InvalidToken(e) => e.kind(),
            Denial::MissingRole => "missing_role",
        }
    }

    pub fn into_api_error(self) -> ApiError {
        match self {
            Denial::MissingRole => ApiError::forbidden("forbidden"),
            Denial::MissingCredential | Denial::InvalidToken(_) => ApiError::unauthorized("unauthorized"),
        }
    }
}

/// Credential from `Authorization: Bearer <token>`.
///
/// The scheme is case-insensitive and separated by exactly one space; the credential must be
/// non-empty and contain no whitespace.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, credential) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    if credential.is_empty() || credential.chars().any(char::is_whitespace) {
        return None;
    }
    Some(credential)
}

/// Verify the bearer token in `headers` and require `role` among its claims.
pub fn authorize(headers: &HeaderMap, verifier: &TokenVerifier, role: &str) -> Result<Claims, Denial> {
    let token = extract_bearer(headers).ok_or(Denial::MissingCredential)?;
    let claims = verifier.verify(token).map_err(Denial::InvalidToken)?;
    if !claims.has_role(role) {
        return Err(Denial::MissingRole);
    }
    Ok(claims)
}

/// Shared state for [`require_role`].
#[derive(Clone, Debug)]
pub struct RoleGate {
    verifier: Arc<TokenVerifier>,
    role: Arc<str>,
}

impl RoleGate {
    pub fn new(verifier: TokenVerifier, role: impl Into<Arc<str>>) -> Self {
        Self {
            verifier: Arc::new(verifier),
            role: role.into(),
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<Claims, Denial> {
        authorize(headers, &self.verifier, &self.role)
    }
}

/// Rejects requests without a valid token carrying the gate's role, otherwise attaches
/// [`AuthUser`] to the request extensions.
pub async fn require_role(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match gate.check(request.headers()) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser::from(claims));
            Ok(next.run(request).await)
        }
        Err(denial) => {
            tracing::debug!(reason = denial.kind(), path = %request.uri().path(), "request denied");
            Err(denial.into_api_error())
        }
    }
}
