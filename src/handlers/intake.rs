use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::router::{InboundMessage, MessageHandler};
use crate::services::intake::{IntakeService, Outcome};
use crate::services::notifier::{self, ReplySink};
use crate::transport::FileFetcher;

/// Routes a PDF upload from an authorized sender through the intake
/// pipeline and replies with the resulting status.
pub struct DocumentHandler {
    intake: Arc<IntakeService>,
    fetcher: Arc<dyn FileFetcher>,
    replies: Arc<dyn ReplySink>,
}

impl DocumentHandler {
    pub fn new(
        intake: Arc<IntakeService>,
        fetcher: Arc<dyn FileFetcher>,
        replies: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            intake,
            fetcher,
            replies,
        }
    }
}

#[async_trait]
impl MessageHandler for DocumentHandler {
    async fn handle(&self, message: &InboundMessage) {
        // The routing predicate guarantees a document is attached.
        let Some(document) = &message.document else {
            return;
        };
        info!(
            "📄 Receiving {} from {}",
            document.file_name,
            message.sender.as_deref().unwrap_or("<unknown>")
        );

        let outcome = match self.fetcher.fetch(&document.file_id).await {
            Ok(reader) => self.intake.process(&document.file_name, reader).await,
            Err(e) => {
                warn!("Failed to download {}: {}", document.file_name, e);
                Outcome::Failed
            }
        };

        notifier::notify(self.replies.as_ref(), message.chat_id, &outcome).await;
    }
}

/// Catch-all for any other message from an authorized sender.
pub struct IgnoreHandler {
    replies: Arc<dyn ReplySink>,
}

impl IgnoreHandler {
    pub fn new(replies: Arc<dyn ReplySink>) -> Self {
        Self { replies }
    }
}

#[async_trait]
impl MessageHandler for IgnoreHandler {
    async fn handle(&self, message: &InboundMessage) {
        notifier::notify(self.replies.as_ref(), message.chat_id, &Outcome::Ignored).await;
    }
}
