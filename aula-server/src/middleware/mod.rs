//! Middleware for the aula server.

mod auth;

pub use auth::{AuthLayer, auth_middleware};
pub(crate) use auth::bearer_token;
