//! Shared test infrastructure
//!
//! Starts a real server on an OS-assigned port with a temporary destination
//! directory and offers helpers for multipart requests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::oneshot;
use upload_intake::config::Config;
use upload_intake::server::Server;

/// Test environment with a running server
pub struct TestEnv {
    pub server_addr: SocketAddr,
    pub dir: TempDir,
    pub client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestEnv {
    /// Start a server with default settings
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server after letting the caller adjust the config
    pub async fn start_with(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.server.address = "127.0.0.1:0".into();
        config.storage.destination_dir = dir.path().display().to_string();
        adjust(&mut config);

        let server = Server::new(config).await.expect("Failed to create server");
        let server_addr = server.local_addr();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(server.run_until(async {
            let _ = shutdown_rx.await;
        }));

        Self {
            server_addr,
            dir,
            client: reqwest::Client::new(),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.server_addr, path)
    }

    pub fn dest(&self) -> &Path {
        self.dir.path()
    }

    /// POST a multipart form and decode the JSON response
    pub async fn post_form(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> (reqwest::StatusCode, serde_json::Value) {
        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Request failed");
        decode(response).await
    }

    /// Names of the files currently in the destination directory
    pub fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dest())
            .expect("Failed to read destination dir")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Decode status, content type check and JSON body
pub async fn decode(response: reqwest::Response) -> (reqwest::StatusCode, serde_json::Value) {
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(content_type, "application/json", "upload routes answer JSON");
    let body = response.json().await.expect("Body is not JSON");
    (status, body)
}

/// A file part with a filename and declared media type
pub fn file_part(name: &str, mime: &str, data: &[u8]) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(data.to_vec())
        .file_name(name.to_string())
        .mime_str(mime)
        .expect("valid mime")
}
