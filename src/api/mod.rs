//! HTTP API layer: handlers, middleware, and configurable routing

pub mod handlers;
pub mod middleware;
pub mod oauth_handlers;
pub mod routes;

pub use handlers::{AppState, SuccessResponse};
pub use middleware::AuthUser;
pub use routes::RouterBuilder;
