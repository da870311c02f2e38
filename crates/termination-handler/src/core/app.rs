use std::sync::Arc;

use anyhow::Context;
use ec2_metadata::MetadataClient;
use tracing::info;

use crate::{
    core::TerminationWatcher,
    domain::MetadataSource,
    infra::{Ec2MetadataSource, LogGuard, Settings},
};

pub struct App {
    _log_guard: LogGuard,
    watcher: TerminationWatcher,
}

impl App {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let log_guard = LogGuard::init();

        let client = MetadataClient::new()
            .context("failed to build metadata client")?
            .with_url(settings.metadata_url.clone())
            .with_timeout(settings.request_timeout);
        let source: Arc<dyn MetadataSource> = Arc::new(Ec2MetadataSource::from_client(client));

        let watcher = TerminationWatcher::new(Some(source), settings.interval)?;

        Ok(Self {
            _log_guard: log_guard,
            watcher,
        })
    }

    /// Single poll, no handoff.
    pub async fn check(self) -> bool {
        self.watcher.is_terminating().await
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            interval = ?self.watcher.interval(),
            "app running..."
        );

        let notice = self.watcher.start().await?;

        info!(
            termination_time = %notice.termination_time,
            observed_at = %notice.observed_at,
            "termination preparation complete"
        );

        Ok(())
    }
}
