//! Upload Intake Library
//!
//! Accepts `multipart/form-data` uploads over HTTP, validates each file part,
//! stores it in a server-side directory and reports the outcome as JSON.
//!
//! # Features
//!
//! - **Single and batch routes**: one named field, or any number of parts
//! - **Media type allow-list**: exact match on the declared type for image routes
//! - **No partial files**: write-then-rename storage, cleaned up on failure
//! - **Deterministic reports**: one outcome per submitted part, in order
//!
//! # Example
//!
//! ```no_run
//! use upload_intake::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod metrics;
pub mod router;
pub mod server;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
