pub mod telegram;

use async_trait::async_trait;
use tokio::io::AsyncRead;

/// Downloads an upload's bytes by its transport file id. A trait seam so
/// the intake handler can be tested against canned byte streams.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, file_id: &str) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>>;
}
