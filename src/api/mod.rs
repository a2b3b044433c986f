pub mod error;
pub mod routes;
pub mod table;

pub use error::ApiError;
pub use routes::build_router;
