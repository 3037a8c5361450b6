//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack, graceful shutdown)
//!     → inactivity layer (in-flight accounting, deadline reset)
//!     → request.rs (request ID, span, access log)
//!     → handlers.rs (health, items CRUD)
//!     → response.rs (error mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
