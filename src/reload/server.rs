//! WebSocket server for live reload.
//!
//! Accepts browser connections on a background thread and broadcasts a
//! `reload` message after each successful rebuild. Dead clients are
//! dropped on the next broadcast.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tungstenite::{Message, WebSocket, accept};

use crate::{debug, log};

/// Default WebSocket port for live reload
pub const DEFAULT_WS_PORT: u16 = 35729;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Connected reload clients.
#[derive(Default)]
pub struct ReloadHub {
    clients: Mutex<Vec<WebSocket<TcpStream>>>,
}

impl ReloadHub {
    /// Send `reload` to every connected browser, dropping dead sockets.
    pub fn broadcast_reload(&self) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|ws| ws.send(Message::text("reload")).is_ok());
        debug!("reload"; "notified {} client(s)", clients.len());
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    fn add_client(&self, ws: WebSocket<TcpStream>) {
        self.clients.lock().push(ws);
    }
}

/// Start the reload WebSocket server.
///
/// Binds `base_port` (retrying on the following ports if taken), spawns
/// the acceptor thread, and returns the hub plus the bound port for
/// script injection.
pub fn start_reload_server(base_port: u16) -> Result<(Arc<ReloadHub>, u16)> {
    let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
    let hub = Arc::new(ReloadHub::default());

    let accept_hub = Arc::clone(&hub);
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer = stream.peer_addr().ok();
                    match accept(stream) {
                        Ok(ws) => {
                            if let Some(addr) = peer {
                                debug!("reload"; "client connected: {}", addr);
                            }
                            accept_hub.add_client(ws);
                        }
                        Err(e) => debug!("reload"; "handshake failed: {}", e),
                    }
                }
                Err(e) => {
                    log!("reload"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok((hub, actual_port))
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{}", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind reload server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_with_no_clients_is_noop() {
        let hub = ReloadHub::default();
        hub.broadcast_reload();
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_try_bind_port_retries() {
        // Occupy a port, then ask for it: the next one should be chosen
        let (first, port) = try_bind_port(0, 1).unwrap();
        let (_second, retried) = try_bind_port(port, MAX_PORT_RETRIES).unwrap();
        assert_ne!(retried, port);
        drop(first);
    }
}
