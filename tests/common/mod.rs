//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use rest_mux::config::MuxConfig;
use rest_mux::services::MapService;
use rest_mux::{BoxError, Endpoint, Fault, HttpServer, Route, Shutdown};

/// Length of the string served by the gzipped `/zipped` route.
pub const ZIPPED_LEN: usize = 4096;

/// A server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub map: Arc<MapService>,
    pub root: String,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    /// URL of `path` under the endpoint root.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}{}", self.addr, self.root.trim_end_matches('/'), path)
    }

    /// URL of `path` relative to the server, ignoring the root.
    #[allow(dead_code)]
    pub fn raw_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    #[allow(dead_code)]
    pub async fn stop(self) -> Result<(), std::io::Error> {
        self.shutdown.trigger();
        self.handle.await.expect("server task panicked")
    }
}

fn endpoint(root: &str, map: &Arc<MapService>) -> Endpoint {
    let mut builder = Endpoint::builder(root);
    builder
        .add_service(map)
        .unwrap()
        .add_route(Route::get("/ping", || "pong".to_string()).unwrap())
        .unwrap()
        .add_route(Route::get("/inc/{0:n}", |n: i64| n + 1).unwrap())
        .unwrap()
        .add_route(Route::post("/fail", || Fault::new("BOOM")).unwrap())
        .unwrap()
        .add_route(
            Route::get("/panic", || -> Result<(), BoxError> { panic!("handler panicked") }).unwrap(),
        )
        .unwrap()
        .add_route(
            Route::get("/zipped", || "z".repeat(ZIPPED_LEN))
                .unwrap()
                .with_gzip(6)
                .unwrap(),
        )
        .unwrap()
        .add_route(Route::post("/documentation", || "posted".to_string()).unwrap())
        .unwrap();
    builder.build()
}

/// Start a server with `config`, overriding its bind address.
pub async fn start_server(mut config: MuxConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let map = Arc::new(MapService::new());
    let root = config.endpoint.root.clone();
    let server = HttpServer::new(config, Arc::new(endpoint(&root, &map)));

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    TestServer {
        addr,
        map,
        root,
        shutdown,
        handle,
    }
}

/// Start a server with default config under `root`.
pub async fn start_with_root(root: &str) -> TestServer {
    let mut config = MuxConfig::default();
    config.endpoint.root = root.to_string();
    start_server(config).await
}
