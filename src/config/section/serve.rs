//! `[serve]` section: development server settings.

use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;

/// Development server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind
    pub interface: IpAddr,

    /// Port number to listen on
    pub port: u16,

    /// Watch source files and reload connected browsers on change
    pub watch: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            watch: true,
        }
    }
}
