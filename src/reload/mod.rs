//! Watch loop and live reload.
//!
//! The dev server injects a small script into served HTML documents; the
//! script opens a WebSocket to the reload hub and reloads the page when a
//! rebuild completes. The watch loop debounces filesystem events,
//! classifies them per asset category, re-runs the matching pipeline
//! phases in dependency order, and then broadcasts the reload.

mod server;
mod watch;

pub use server::{DEFAULT_WS_PORT, ReloadHub, start_reload_server};
pub use watch::spawn_watcher;

/// URL path the dev server answers with the reload script.
pub const RELOAD_JS_PATH: &str = "/__plinth/reload.js";

/// In-memory reload client script with the WebSocket port substituted.
pub fn reload_script(ws_port: u16) -> String {
    const TEMPLATE: &str = r#"(function () {
    var socket;
    var connect = function () {
        socket = new WebSocket("ws://" + location.hostname + ":{{ ws_port }}");
        socket.onmessage = function (event) {
            if (event.data === "reload") location.reload();
        };
        socket.onclose = function () {
            setTimeout(connect, 1000);
        };
    };
    connect();
})();
"#;
    TEMPLATE.replace("{{ ws_port }}", &ws_port.to_string())
}
