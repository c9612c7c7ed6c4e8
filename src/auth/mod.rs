// Auth module - user accounts, JWT sessions, request extractors

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;

pub use extractors::AuthedUser;
pub use routes::auth_routes;
