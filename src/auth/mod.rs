//! Authentication Module
//! Mission: Issue bearer tokens at login and guard the table API with them

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod session_store;

pub use api::AuthState;
pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, AuthError, CurrentUser};
pub use session_store::SessionStore;
