use std::sync::Arc;

use async_trait::async_trait;

/// Transport-independent view of one inbound chat message. The transport
/// layer converts its wire format into this before dispatch, so routing and
/// the intake pipeline can be tested without a live connection.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Sender identity, when the transport exposes one.
    pub sender: Option<String>,
    /// Channel to reply on.
    pub chat_id: i64,
    /// Attached document, when the message carries one.
    pub document: Option<DocumentAttachment>,
}

#[derive(Debug, Clone)]
pub struct DocumentAttachment {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
}

impl DocumentAttachment {
    pub fn is_pdf(&self) -> bool {
        self.mime_type.as_deref() == Some("application/pdf")
            || self.file_name.to_lowercase().ends_with(".pdf")
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &InboundMessage);
}

type Predicate = Box<dyn Fn(&InboundMessage) -> bool + Send + Sync>;

/// Ordered predicate-matched dispatch: the first route whose predicate
/// accepts the message handles it; a message matching no route is dropped
/// silently.
#[derive(Default)]
pub struct Router {
    routes: Vec<(Predicate, Arc<dyn MessageHandler>)>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route<P>(mut self, predicate: P, handler: Arc<dyn MessageHandler>) -> Self
    where
        P: Fn(&InboundMessage) -> bool + Send + Sync + 'static,
    {
        self.routes.push((Box::new(predicate), handler));
        self
    }

    /// Returns whether any route accepted the message.
    pub async fn dispatch(&self, message: &InboundMessage) -> bool {
        match self.routes.iter().find(|(predicate, _)| predicate(message)) {
            Some((_, handler)) => {
                handler.handle(message).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    #[async_trait]
    impl MessageHandler for Counter {
        async fn handle(&self, _message: &InboundMessage) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn message(sender: Option<&str>) -> InboundMessage {
        InboundMessage {
            sender: sender.map(String::from),
            chat_id: 7,
            document: None,
        }
    }

    #[tokio::test]
    async fn test_first_matching_route_wins() {
        let first = Arc::new(Counter(AtomicUsize::new(0)));
        let second = Arc::new(Counter(AtomicUsize::new(0)));
        let router = Router::new()
            .route(|_| true, first.clone())
            .route(|_| true, second.clone());

        assert!(router.dispatch(&message(Some("alice"))).await);
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(second.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmatched_message_is_dropped() {
        let handler = Arc::new(Counter(AtomicUsize::new(0)));
        let router = Router::new().route(|m| m.sender.is_some(), handler.clone());

        assert!(!router.dispatch(&message(None)).await);
        assert_eq!(handler.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pdf_detection() {
        let mut attachment = DocumentAttachment {
            file_id: "f".to_string(),
            file_name: "notes.txt".to_string(),
            mime_type: Some("text/plain".to_string()),
        };
        assert!(!attachment.is_pdf());

        attachment.mime_type = Some("application/pdf".to_string());
        assert!(attachment.is_pdf());

        attachment.mime_type = None;
        attachment.file_name = "Report.PDF".to_string();
        assert!(attachment.is_pdf());
    }
}
