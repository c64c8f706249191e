pub mod handlers;

pub use handlers::ServerContext;

use std::net::{IpAddr, SocketAddr};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tokio::sync::oneshot;
use warp::filters::BoxedFilter;
use warp::http::header::{HeaderValue, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::{Filter, Reply};

use handlers::handle_get;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("\"{0}\" is not a valid host address")]
    InvalidHost(String),
    #[error("could not bind the server: {0}")]
    Bind(String),
    #[error("could not spawn the server thread: {0}")]
    Thread(#[from] std::io::Error),
    #[error("the server thread exited before reporting its address")]
    Startup,
}

fn html_response(status: StatusCode, body: String, charset: &str) -> warp::reply::Response {
    let mut response = warp::reply::Response::new(body.into());
    *response.status_mut() = status;
    let content_type = HeaderValue::from_str(&format!("text/html; charset={}", charset))
        .unwrap_or_else(|_| HeaderValue::from_static("text/html"));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

pub fn routes(ctx: Arc<ServerContext>) -> BoxedFilter<(impl Reply,)> {
    let get_ctx = ctx.clone();
    let get = warp::get()
        .and(warp::path::full())
        .map(move |path: warp::path::FullPath| {
            let (status, body) = handle_get(&get_ctx, path.as_str());
            html_response(status, body, &get_ctx.charset)
        });
    // POST handling is acknowledged but not implemented yet.
    let post = warp::post()
        .and(warp::path::full())
        .map(|path: warp::path::FullPath| {
            let mut response =
                warp::reply::Response::new(format!("POST request for {}", path.as_str()).into());
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            response
        });
    get.or(post).boxed()
}

struct RunningServer {
    shutdown: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
    addr: SocketAddr,
}

/// Owns a background HTTP server. Starting an already-running handle and
/// stopping an already-stopped one are both no-ops, so callers can wire
/// these straight to toggles.
#[derive(Default)]
pub struct ServerHandle {
    running: Option<RunningServer>,
}

impl ServerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Starts the server on its own thread and returns the bound address.
    /// If the server is already running, returns the existing address.
    pub fn start(&mut self, ctx: ServerContext) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Ok(running.addr);
        }
        let ip: IpAddr = ctx
            .host
            .parse()
            .map_err(|_| ServerError::InvalidHost(ctx.host.clone()))?;
        let requested = SocketAddr::new(ip, ctx.port);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<SocketAddr, ServerError>>();

        let thread = thread::Builder::new().name("mdserve-http".into()).spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = ready_tx.send(Err(ServerError::Thread(err)));
                    return;
                }
            };
            runtime.block_on(async move {
                let filter = routes(Arc::new(ctx));
                match warp::serve(filter).try_bind_with_graceful_shutdown(requested, async {
                    shutdown_rx.await.ok();
                }) {
                    Ok((addr, server)) => {
                        log::info!("serving on http://{}", addr);
                        let _ = ready_tx.send(Ok(addr));
                        server.await;
                        log::info!("server on http://{} stopped", addr);
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(ServerError::Bind(err.to_string())));
                    }
                }
            });
        })?;

        match ready_rx.recv() {
            Ok(Ok(addr)) => {
                self.running = Some(RunningServer {
                    shutdown: shutdown_tx,
                    thread,
                    addr,
                });
                Ok(addr)
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(ServerError::Startup)
            }
        }
    }

    /// Stops the server and waits for its thread to finish. Safe to call
    /// when nothing is running.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(());
            if running.thread.join().is_err() {
                log::error!("server thread panicked during shutdown");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
