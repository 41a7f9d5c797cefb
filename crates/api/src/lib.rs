pub mod auth;
pub mod inactivity;
pub mod lifecycle;
pub mod schema;
