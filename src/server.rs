use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::protocol::{Dispatcher, Reply};
use crate::store::Store;

/// HTTP server
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Dispatcher,
    request_timeout: Duration,
}

impl Server {
    /// Bind the configured address and serve the given store
    pub async fn bind(config: &Config, store: Arc<dyn Store>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.server_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("HTTP server bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            dispatcher: Dispatcher::new(store),
            request_timeout: config.request_timeout(),
        })
    }

    /// Get local listening address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and serve connections until `shutdown` resolves, then wait
    /// for in-flight connections to finish
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Server started, listening on {}", self.local_addr);

        let app = router(self.dispatcher, self.request_timeout);
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        debug!("New connection accepted from {}", peer_addr);
                        connections.spawn(serve_connection(
                            stream,
                            peer_addr,
                            app.clone(),
                            self.request_timeout,
                        ));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(
            "Server on {} shutting down, draining {} connections",
            self.local_addr,
            connections.len()
        );
        while connections.join_next().await.is_some() {}
        info!("Server on {} stopped", self.local_addr);
        Ok(())
    }
}

/// Serve one request on one connection.
///
/// Request headers must arrive within `request_timeout`, and the whole
/// exchange (headers, body, reply write) within twice that: one budget
/// for reading the request and one for writing the response. Keep-alive
/// is off so the deadline is per request.
async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    app: Router,
    request_timeout: Duration,
) {
    let deadline = request_timeout * 2;
    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(request_timeout)
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(app));

    match tokio::time::timeout(deadline, conn).await {
        Ok(Ok(())) => debug!("Connection from {} closed", peer_addr),
        Ok(Err(e)) => warn!("Error serving connection from {}: {}", peer_addr, e),
        Err(_) => warn!(
            "Connection from {} exceeded {:?}, dropping it",
            peer_addr, deadline
        ),
    }
}

/// Build the request router.
///
/// Every request goes through one fallback handler. The timeout bounds
/// reading the body and producing the reply; an elapsed request is
/// answered with an empty 408 and never reaches the store.
pub fn router(dispatcher: Dispatcher, request_timeout: Duration) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(dispatcher)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn handle(State(dispatcher): State<Dispatcher>, request: Request) -> Reply {
    let (parts, body) = request.into_parts();
    let payload = axum::body::to_bytes(body, usize::MAX);
    dispatcher
        .dispatch(&parts.method, parts.uri.path(), payload)
        .await
}
