//! Build state tracking for serve mode.
//!
//! Three orthogonal states:
//! - `SERVING`: Is the site ready to serve requests? (initial build complete)
//! - `BUSY`: Is a rebuild in progress? (request gating)
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tiny_http::Server;

/// Site is ready to serve requests (initial build complete)
/// - `false`: Show loading page
/// - `true`: Serve normally
static SERVING: AtomicBool = AtomicBool::new(false);

/// Rebuild is in progress (request gating)
/// - `false`: Serve immediately
/// - `true`: Wait for rebuild to complete
static BUSY: AtomicBool = AtomicBool::new(false);

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown signal sender for the watch loop
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

// =============================================================================
// SERVING state
// =============================================================================

/// Check if the site is ready to serve requests
pub fn is_serving() -> bool {
    SERVING.load(Ordering::SeqCst)
}

/// Mark the site as ready to serve (call after initial build completes)
pub fn set_serving() {
    SERVING.store(true, Ordering::SeqCst);
}

// =============================================================================
// BUSY state (rebuild gating)
// =============================================================================

/// Check if a rebuild is in progress
pub fn is_busy() -> bool {
    BUSY.load(Ordering::Acquire)
}

/// Mark rebuild as started
pub fn begin_update() {
    BUSY.store(true, Ordering::Release);
}

/// Mark rebuild as finished
pub fn end_update() {
    BUSY.store(false, Ordering::Release);
}

/// Block until the in-flight rebuild (if any) has finished.
///
/// Requests arriving mid-rebuild wait here so a response never observes a
/// half-written output tree or a partially persisted manifest. Bounded so a
/// wedged rebuild cannot hang the server.
pub fn wait_while_busy(max_wait: Duration) {
    let start = std::time::Instant::now();
    while is_busy() && start.elapsed() < max_wait && !is_shutdown() {
        std::thread::sleep(Duration::from_millis(10));
    }
}

// =============================================================================
// SHUTDOWN state
// =============================================================================

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether a server has been registered:
/// - Before `register_server()`: Sets SHUTDOWN flag, process exits naturally
/// - After `register_server()`: Graceful shutdown (unblock server, stop watcher)
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        // Notify the watch loop
        if let Some(tx) = SHUTDOWN_TX.get() {
            let _ = tx.send(());
        }

        // Unblock HTTP server, or exit immediately if not yet serving
        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown
///
/// Call this after binding the server, before entering the request loop
pub fn register_server(server: Arc<Server>, shutdown_tx: crossbeam::channel::Sender<()>) {
    let _ = SERVER.set(server);
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering for performance - worst case is processing
/// a few more items before stopping, which is acceptable
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_gate() {
        BUSY.store(false, Ordering::SeqCst);

        begin_update();
        assert!(is_busy());

        end_update();
        assert!(!is_busy());
    }

    #[test]
    fn test_wait_while_busy_returns_when_free() {
        BUSY.store(false, Ordering::SeqCst);
        let start = std::time::Instant::now();
        wait_while_busy(Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
