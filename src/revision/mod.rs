//! Asset revisioning: content fingerprints and the cache-bust manifest.
//!
//! Release builds rename every built asset to a content-addressed filename
//! (`css/site.css` -> `static/css/site-a1b2c3d4.css`) and persist the
//! logical->fingerprinted mapping so template rendering can rewrite asset
//! URLs. Development builds skip all of this and serve logical paths.

mod fingerprint;
mod manifest;
mod process;

pub use fingerprint::{FINGERPRINT_LEN, fingerprint, fingerprinted_path};
pub use manifest::{AssetResolver, MANIFEST_FILE, Manifest, RevisionError};
pub use process::revision_assets;
