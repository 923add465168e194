use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::flags::FlagHandle;
use crate::handlers::{probes, products};
use crate::middleware::{offline_gate, require_role, RoleGate};
use crate::services::CatalogService;

/// Per-request state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub flags: FlagHandle,
}

/// HTTP-level knobs taken from `ServerConfig`.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Build the full application router.
///
/// Reads are public. Create, update, and delete sit behind `gate`. The offline switch wraps
/// everything so probes are the only routes answered while it is on.
pub fn router(state: AppState, gate: RoleGate, options: HttpOptions) -> Router {
    let flags = state.flags.clone();

    Router::new()
        .merge(product_routes(gate))
        .merge(probe_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer(&options.cors_origins))
                .layer(TimeoutLayer::new(options.request_timeout))
                .layer(from_fn_with_state(flags, offline_gate)),
        )
}

fn product_routes(gate: RoleGate) -> Router<AppState> {
    let guarded = |method: axum::routing::MethodRouter<AppState>| {
        method.route_layer(from_fn_with_state(gate.clone(), require_role))
    };

    Router::new()
        .route(
            "/products",
            get(products::list).merge(guarded(post(products::create))),
        )
        .route(
            "/products/:id",
            get(products::show)
                .merge(guarded(put(products::update)))
                .merge(guarded(delete(products::delete))),
        )
        .layer(TraceLayer::new_for_http())
}

fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(probes::health))
        .route("/ready", get(probes::ready))
        .route("/_flags", get(probes::flags))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
}
