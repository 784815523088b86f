//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/authorize.rs (pattern table decision, 403 on deny)
//!     → handlers.rs (management endpoints)
//!     → websocket.rs (live-update connections)
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
