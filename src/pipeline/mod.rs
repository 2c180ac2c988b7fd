//! Asset pipelines: styles, scripts, images, passthrough copy.
//!
//! Each pipeline reads one class of source files from the assets directory
//! and produces files in the output directory. The pipelines are
//! independent of each other; the build orchestrator decides ordering and
//! parallelism. None of them know about fingerprinting - the revision
//! phase consumes whatever they produced.

mod copy;
mod images;
mod scripts;
mod styles;

pub use copy::process_passthrough;
pub use images::process_images;
pub use scripts::process_scripts;
pub use styles::{compile_css, process_styles};

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if file A is newer than file B
///
/// Returns `true` if A exists and is newer than B. Used to skip unchanged
/// copies during development rebuilds; release builds always start clean.
pub(crate) fn is_newer_than(a: &Path, b: &Path) -> bool {
    let (Some(a_time), Some(b_time)) = (get_mtime(a), get_mtime(b)) else {
        return false;
    };
    a_time > b_time
}
