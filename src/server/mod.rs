//! HTTP server module
//!
//! Binds the listener, prepares the destination directory and serves the
//! upload routes on `hyper` + `tokio`, one task per connection.
//!
//! # Example
//!
//! ```no_run
//! use upload_intake::config::Config;
//! use upload_intake::server::Server;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.server.address = "127.0.0.1:0".to_string();
//! let server = Server::new(config).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::{Config, ConfigError, StorageConfig};
use crate::metrics::server::MetricsServer;
use crate::router;
use crate::upload::multipart::MultipartLimits;
use crate::upload::UploadIntake;

pub mod http;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Destination directory unavailable: {0}")]
    StorageUnavailable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    RuntimeError(String),
}

/// State shared by every connection
pub struct AppState {
    pub intake: UploadIntake,
    pub limits: MultipartLimits,
}

/// HTTP Server
pub struct Server {
    config: Config,
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Validate the configuration, prepare the destination directory and bind.
    ///
    /// Port 0 lets the OS pick a port; see [`Server::local_addr`].
    pub async fn new(config: Config) -> Result<Self, ServerError> {
        config.validate()?;

        let destination = prepare_destination(&config.storage).await?;
        info!(path = %destination.display(), "Destination directory ready");

        let addr: SocketAddr = config
            .server
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        let state = Arc::new(AppState {
            intake: UploadIntake::new(config.intake_settings()),
            limits: MultipartLimits {
                max_file_bytes: config.upload.max_file_bytes,
                max_request_bytes: config.upload.max_request_bytes,
            },
        });

        Ok(Self {
            config,
            state,
            listener,
            local_addr,
        })
    }

    /// The address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Connections already accepted keep running to completion.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Listening on port {}, registered routes:", self.local_addr.port());
        for route in router::routes() {
            info!(route = route.path, "{}", route.describe());
        }

        let mut metrics_server = None;
        if self.config.metrics.enabled {
            let mut server = MetricsServer::new(self.config.metrics.address.clone());
            server
                .start()
                .await
                .map_err(|e| ServerError::RuntimeError(format!("Metrics server: {}", e)))?;
            metrics_server = Some(server);
        }

        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { http::handle_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }

        info!("Shutting down server");
        if let Some(mut server) = metrics_server {
            server.shutdown().await;
        }
        Ok(())
    }
}

/// Make sure the destination directory exists and is writable
async fn prepare_destination(storage: &StorageConfig) -> Result<PathBuf, ServerError> {
    let dir = PathBuf::from(&storage.destination_dir);

    if storage.create_if_missing {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| unavailable(&dir, e))?;
    }

    let metadata = tokio::fs::metadata(&dir)
        .await
        .map_err(|e| unavailable(&dir, e))?;

    if !metadata.is_dir() {
        return Err(ServerError::StorageUnavailable(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    if metadata.permissions().readonly() {
        return Err(ServerError::StorageUnavailable(format!(
            "{} is read-only",
            dir.display()
        )));
    }

    Ok(dir)
}

fn unavailable(dir: &Path, e: std::io::Error) -> ServerError {
    ServerError::StorageUnavailable(format!("{}: {}", dir.display(), e))
}
