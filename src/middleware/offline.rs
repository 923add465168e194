use axum::{extract::Request, extract::State, middleware::Next, response::Response};

use crate::error::ApiError;
use crate::flags::FlagHandle;

/// Probe paths stay reachable while the service is switched offline.
const ALWAYS_ON: &[&str] = &["/health", "/ready"];

/// Answers 503 for everything except probes while the `offline` flag is set.
pub async fn offline_gate(
    State(flags): State<FlagHandle>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if flags.is_offline() && !ALWAYS_ON.contains(&request.uri().path()) {
        return Err(ApiError::service_unavailable("service temporarily offline"));
    }
    Ok(next.run(request).await)
}
