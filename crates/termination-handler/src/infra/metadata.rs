use anyhow::Context;
use async_trait::async_trait;
use ec2_metadata::MetadataClient;

use crate::domain::MetadataSource;

/// [`MetadataSource`] backed by the instance metadata HTTP service.
pub struct Ec2MetadataSource {
    client: MetadataClient,
}

impl Ec2MetadataSource {
    /// Source bound to the link-local endpoint with default timeouts.
    pub fn new() -> anyhow::Result<Self> {
        let client = MetadataClient::new().context("failed to build metadata client")?;
        Ok(Self::from_client(client))
    }

    #[must_use]
    pub fn from_client(client: MetadataClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataSource for Ec2MetadataSource {
    async fn get_metadata(&self, key: &str) -> anyhow::Result<String> {
        Ok(self.client.get_metadata(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::{SecondsFormat, Utc};
    use ec2_metadata::testing::{MockMetadataServer, MockResponse};

    use super::*;
    use crate::core::TerminationWatcher;

    fn watcher_for(server: &MockMetadataServer) -> TerminationWatcher {
        let client = MetadataClient::new().unwrap().with_url(server.url());
        let source: Arc<dyn MetadataSource> = Arc::new(Ec2MetadataSource::from_client(client));
        TerminationWatcher::new(Some(source), Duration::from_secs(30)).unwrap()
    }

    #[tokio::test]
    async fn test_is_terminating_with_future_date() {
        let future = Utc::now() + chrono::Duration::minutes(2);
        let server = MockMetadataServer::start(vec![MockResponse::ok(
            future.to_rfc3339_opts(SecondsFormat::Secs, true),
        )])
        .await;

        assert!(watcher_for(&server).is_terminating().await);
        assert_eq!(
            server.requests().await,
            vec!["/latest/meta-data/spot/termination-time".to_string()]
        );
    }

    #[tokio::test]
    async fn test_is_terminating_with_past_date() {
        let server =
            MockMetadataServer::start(vec![MockResponse::ok("2015-01-05T18:02:00Z")]).await;

        assert!(!watcher_for(&server).is_terminating().await);
    }

    #[tokio::test]
    async fn test_is_terminating_when_not_terminating() {
        let server = MockMetadataServer::start(vec![MockResponse::not_found()]).await;

        assert!(!watcher_for(&server).is_terminating().await);
    }

    #[tokio::test]
    async fn test_server_error_is_not_terminating() {
        let server = MockMetadataServer::start(vec![MockResponse::status(503, "busy")]).await;

        assert!(!watcher_for(&server).is_terminating().await);
    }

    #[tokio::test]
    async fn test_source_surfaces_status_errors() {
        let server = MockMetadataServer::start(vec![MockResponse::not_found()]).await;
        let client = MetadataClient::new().unwrap().with_url(server.url());
        let source = Ec2MetadataSource::from_client(client);

        let err = source
            .get_metadata("spot/termination-time")
            .await
            .unwrap_err();

        let status = err
            .downcast_ref::<ec2_metadata::MetadataError>()
            .expect("metadata error");
        assert!(status.is_not_found());
    }
}
