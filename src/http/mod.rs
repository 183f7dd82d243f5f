//! HTTP surface: health, room lookup and the WebSocket upgrade route

pub mod routes;

pub use routes::build_router;
