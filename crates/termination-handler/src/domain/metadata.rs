use async_trait::async_trait;

/// Read access to a single string value in the instance metadata tree.
#[async_trait]
pub trait MetadataSource: Send + Sync + 'static {
    async fn get_metadata(&self, key: &str) -> anyhow::Result<String>;
}
