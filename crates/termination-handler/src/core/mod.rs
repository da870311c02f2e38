mod app;
pub mod watcher;

pub use app::App;
pub use watcher::TerminationWatcher;
