//! Route handlers for the HTTP server
//!
//! Handlers are organized by domain:
//! - [`convert`] - Image upload and conversion
//! - [`system`] - Health, capabilities, OpenAPI

mod convert;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use convert::*;
pub use system::*;
