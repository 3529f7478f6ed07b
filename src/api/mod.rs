//! API Module
//!
//! HTTP handlers and routing for the store server, exposing the primitives
//! the cache coordinates through.
//!
//! # Endpoints
//! - `GET|PUT|DELETE /kv` - Byte values
//! - `POST /kv/expire` - Apply a TTL
//! - `POST /list/push` - Push with TTL
//! - `POST /list/pop` - Blocking pop
//! - `GET /stats` - Store statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
