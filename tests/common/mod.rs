//! Shared utilities for integration tests.

use std::sync::Arc;

use live_config::config::ServiceConfig;
use live_config::lifecycle::startup::build_service;
use live_config::{ConfigService, RpcServer, Shutdown};
use live_config_client::ConfigClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A running service bound to an ephemeral port.
pub struct TestServer {
    pub url: String,
    pub service: Arc<ConfigService>,
    pub shutdown: Arc<Shutdown>,
}

impl TestServer {
    pub fn client(&self) -> ConfigClient {
        ConfigClient::new(&self.url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the RPC server with `config`, ignoring its bind address.
pub async fn start_server(config: ServiceConfig) -> TestServer {
    let service = build_service(&config).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let server = RpcServer::new(Arc::clone(&service), &config.rpc);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestServer {
        url: format!("http://{}", addr),
        service,
        shutdown,
    }
}

/// Serve `body` with `status` to every request; returns the base URL.
#[allow(dead_code)]
pub async fn start_source_server(status: u16, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = Arc::clone(&body);
            tokio::spawn(async move {
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    _ => "500 Internal Server Error",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}
