//! Build mode configuration for release/development builds.
//!
//! The mode is an explicit value passed into every phase, never a
//! process-wide mutable flag.

/// Build mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Whether to fingerprint assets and write the cache-bust manifest.
    pub fingerprint: bool,

    /// Whether to minify CSS/JS output.
    pub minify: bool,
}

impl BuildMode {
    /// Release mode: minified, fingerprinted, cache-busted output.
    pub const RELEASE: Self = Self {
        fingerprint: true,
        minify: true,
    };

    /// Development mode: fast iteration, logical asset paths served as-is.
    pub const DEVELOPMENT: Self = Self {
        fingerprint: false,
        minify: false,
    };

    /// Check if this is development mode.
    #[inline]
    pub const fn is_dev(&self) -> bool {
        !self.fingerprint
    }
}
