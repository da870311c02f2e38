use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{
    domain::{MetadataSource, TERMINATION_TIME_KEY, TerminationNotice, notice::evaluate},
    infra::Ec2MetadataSource,
};

/// Polls instance metadata for a spot termination notice and hands the first
/// positive result to the caller of [`TerminationWatcher::start`].
///
/// The watcher is single use: `start` consumes it, and the notice is
/// delivered at most once.
pub struct TerminationWatcher {
    source: Arc<dyn MetadataSource>,
    interval: Duration,
    notice_tx: oneshot::Sender<TerminationNotice>,
    notice_rx: oneshot::Receiver<TerminationNotice>,
}

impl TerminationWatcher {
    /// Builds a watcher over `source`, or over the link-local metadata
    /// service when `source` is `None`.
    pub fn new(source: Option<Arc<dyn MetadataSource>>, interval: Duration) -> anyhow::Result<Self> {
        let source = match source {
            Some(source) => source,
            None => Arc::new(Ec2MetadataSource::new()?),
        };

        let (notice_tx, notice_rx) = oneshot::channel();

        Ok(Self {
            source,
            interval,
            notice_tx,
            notice_rx,
        })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs a single poll.
    pub async fn is_terminating(&self) -> bool {
        poll(self.source.as_ref()).await.is_some()
    }

    /// Spawns the polling loop and waits for it to report a termination
    /// notice. There is no way to stop the loop other than a notice.
    pub async fn start(self) -> anyhow::Result<TerminationNotice> {
        info!("starting handler...");

        let Self {
            source,
            interval,
            notice_tx,
            notice_rx,
        } = self;

        tokio::spawn(watch(source, interval, notice_tx));

        let notice = notice_rx
            .await
            .context("watcher stopped without delivering a termination notice")?;

        info!(
            termination_time = %notice.termination_time,
            "notification received, preparing for termination..."
        );

        Ok(notice)
    }
}

async fn poll(source: &dyn MetadataSource) -> Option<TerminationNotice> {
    let result = source.get_metadata(TERMINATION_TIME_KEY).await;
    evaluate(result, Utc::now())
}

async fn watch(
    source: Arc<dyn MetadataSource>,
    interval: Duration,
    notice_tx: oneshot::Sender<TerminationNotice>,
) {
    info!("starting watcher...");

    let notice = loop {
        debug!("checking if instance is terminating...");

        if let Some(notice) = poll(source.as_ref()).await {
            break notice;
        }

        debug!("instance is not terminating");
        debug!("sleeping for {:?}...", interval);
        tokio::time::sleep(interval).await;
    };

    info!("instance is terminating, notifying handler");

    if notice_tx.send(notice).is_err() {
        warn!("termination handler is gone, notice dropped");
    }
}
