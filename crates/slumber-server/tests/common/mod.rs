//! Common test infrastructure for end-to-end tests.

use slumber_config::AppConfig;
use slumber_server::demo::demo_app;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// The sample application served on an ephemeral local port.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Starts the sample application with the given configuration.
    pub async fn start(config: AppConfig) -> Self {
        let router = demo_app(config).build().expect("Failed to build router");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Test server failed");
        });

        Self { addr, handle }
    }

    /// Absolute URL of the applications root.
    pub fn root_url(&self) -> String {
        format!("http://{}/slumber/", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
