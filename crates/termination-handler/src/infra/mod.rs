pub mod config;
pub mod logging;
pub mod metadata;

pub use config::{Config, Settings};
pub use logging::LogGuard;
pub use metadata::Ec2MetadataSource;
