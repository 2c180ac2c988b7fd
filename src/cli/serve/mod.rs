//! Development server with live reload support.

mod content;
mod lifecycle;
mod path;
mod response;

use crate::{
    cli::build::build_site,
    config::SiteConfig,
    core::{self, BuildMode},
    log,
    logger::status_error,
    reload,
};
use anyhow::Result;
use crossbeam::channel;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tiny_http::{Request, Server};

/// How long a request waits for an in-flight rebuild before serving anyway.
const BUSY_WAIT: Duration = Duration::from_secs(5);

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop
///
/// This allows the caller to run the initial build in the background while
/// already answering requests with a loading page.
pub fn bind_server(config: &SiteConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    core::register_server(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the request loop (blocking).
    pub fn run(self, config: Arc<SiteConfig>) -> Result<()> {
        let (watch_handle, ws_port) =
            lifecycle::spawn_watch(Arc::clone(&config), self.shutdown_rx.clone());

        run_request_loop(&self.server, &config, ws_port);

        lifecycle::wait_for_shutdown(watch_handle);
        Ok(())
    }
}

/// Start serve: bind first, build in the background, then serve.
pub fn serve_site(config: Arc<SiteConfig>) -> Result<()> {
    let bound = bind_server(&config)?;

    // Initial build runs in the background; requests see the loading page
    // until it completes.
    let build_config = Arc::clone(&config);
    std::thread::spawn(move || {
        match build_site(BuildMode::DEVELOPMENT, &build_config, false) {
            Ok(()) => {}
            Err(e) => {
                // Degrade: serve whatever exists, surface the diagnostic
                status_error("initial build failed", &format!("{e:#}"));
            }
        }
        core::set_serving();
    });

    bound.run(config)
}

fn run_request_loop(server: &Server, config: &Arc<SiteConfig>, ws_port: Option<u16>) {
    // Thread pool keeps one slow response from blocking the rest
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("failed to create thread pool");

    for request in server.incoming_requests() {
        let config = Arc::clone(config);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &config, ws_port) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, config: &SiteConfig, ws_port: Option<u16>) -> Result<()> {
    // Early exit if shutdown requested
    if core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    // Serve the reload script from memory (doesn't depend on file system)
    if let Some(port) = ws_port
        && request.url() == reload::RELOAD_JS_PATH
    {
        return response::respond_reload_js(request, port);
    }

    if !core::is_serving() {
        return response::respond_loading(request);
    }

    // A watch-triggered rebuild may be mid-flight; wait for its completion
    // signal so the response never sees a half-written output tree.
    core::wait_while_busy(BUSY_WAIT);

    match path::resolve_path(request.url(), &config.build.output) {
        Some(file) => response::respond_file(request, &file, ws_port),
        None => response::respond_not_found(request, config, ws_port),
    }
}
