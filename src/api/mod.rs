//! API Module
//!
//! Member protocol over HTTP: peers forward invocations and reach the
//! partitions this member owns.
//!
//! # Endpoints
//! - `POST /cluster/invoke` - Execute a forwarded operation
//! - `GET|PUT|DELETE /cluster/cache/:namespace/:key` - Partition access
//! - `GET /cluster/contains/:namespace/:key` - Liveness of a key
//! - `GET /stats` - Per-namespace statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
