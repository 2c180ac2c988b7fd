//! Server lifecycle management.

use crate::{config::SiteConfig, log, reload};
use anyhow::Result;
use crossbeam::channel::Receiver;
use std::{
    net::SocketAddr,
    sync::Arc,
    thread::JoinHandle,
};
use tiny_http::Server;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(
    interface: std::net::IpAddr,
    base_port: u16,
) -> Result<(Server, SocketAddr)> {
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < MAX_PORT_RETRIES => continue,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to bind after {} attempts (ports {}-{}): {}",
                    MAX_PORT_RETRIES,
                    base_port,
                    port,
                    e
                ));
            }
        }
    }
    unreachable!()
}

/// Start the reload hub and watch thread when watching is enabled.
///
/// Returns the watch thread handle and the WebSocket port browsers should
/// connect to (None when watching is disabled).
pub fn spawn_watch(
    config: Arc<SiteConfig>,
    shutdown_rx: Receiver<()>,
) -> (Option<JoinHandle<()>>, Option<u16>) {
    if !config.serve.watch {
        return (None, None);
    }

    let (hub, ws_port) = match reload::start_reload_server(reload::DEFAULT_WS_PORT) {
        Ok(started) => started,
        Err(e) => {
            log!("reload"; "disabled: {:#}", e);
            return (None, None);
        }
    };

    let handle = reload::spawn_watcher(config, hub, shutdown_rx);
    (Some(handle), Some(ws_port))
}

/// Wait for the watch thread to shutdown gracefully (max 2 seconds).
pub fn wait_for_shutdown(handle: Option<JoinHandle<()>>) {
    let Some(handle) = handle else { return };

    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
}
