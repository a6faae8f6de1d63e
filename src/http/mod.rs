//! HTTP surface: health, kill feed and the WebSocket upgrade route

pub mod routes;

pub use routes::build_router;
