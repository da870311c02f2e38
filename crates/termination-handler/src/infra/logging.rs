use std::io::Write;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "termination_handler=info,ec2_metadata=info";

#[must_use = "LogGuard must be held to keep logging active"]
#[non_exhaustive]
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl LogGuard {
    /// Logs go to stderr; stdout is reserved for command output such as
    /// the result of `check`.
    pub fn init() -> Self {
        Self::with_writer(std::io::stderr())
    }

    pub fn with_writer<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(non_blocking_writer))
            .try_init()
            .expect("failed to init tracing");

        Self { _guard: guard }
    }
}
