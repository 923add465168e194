pub mod auth;
pub mod offline;
pub mod response;

pub use auth::{authorize, extract_bearer, require_role, AuthUser, Denial, RoleGate};
pub use offline::offline_gate;
pub use response::{ApiResponse, ApiResult};
