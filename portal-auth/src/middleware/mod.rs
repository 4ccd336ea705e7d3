pub mod auth;
pub mod guards;

pub use auth::{auth_middleware, AuthContext, CurrentUser};
