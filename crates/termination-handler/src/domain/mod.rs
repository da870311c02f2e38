pub mod metadata;
pub mod notice;

pub use metadata::MetadataSource;
pub use notice::{TERMINATION_TIME_KEY, TerminationNotice};
