pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::{DEFAULT_ENDPOINT, MetadataClient};
pub use error::MetadataError;
