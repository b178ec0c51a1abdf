//! HTTP API for the relay

pub mod handlers;
pub mod relay_handlers;
pub mod routes;

pub use routes::create_router;
