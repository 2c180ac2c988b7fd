//! Configuration section definitions.

mod build;
mod serve;
mod site;

pub use build::{BuildSectionConfig, ImagesConfig};
pub use serve::ServeConfig;
pub use site::SiteSectionConfig;
