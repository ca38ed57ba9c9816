use async_trait::async_trait;
use tracing::warn;

use crate::services::intake::Outcome;

/// Where replies go. The Telegram client implements this in production;
/// tests record the strings instead.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}

/// The literal reply for a terminal outcome. Exactly one reply is sent per
/// routed message; unauthorized messages never get here.
pub fn reply_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Ignored => "Ignoring...".to_string(),
        Outcome::Stored { filename } => format!("{filename} stored successfully."),
        Outcome::Decrypted { password_name } => {
            format!("Decrypted with {password_name} password")
        }
        Outcome::UnknownPassword => "PDF is encrypted with unknown password".to_string(),
        Outcome::Malformed | Outcome::Failed => "Failed to process the document".to_string(),
    }
}

/// Send the reply for an outcome, swallowing transport failures. A reply
/// that cannot be delivered must not fail the upload that produced it.
pub async fn notify(sink: &dyn ReplySink, chat_id: i64, outcome: &Outcome) {
    let text = reply_text(outcome);
    if let Err(e) = sink.send_text(chat_id, &text).await {
        warn!("Failed to send reply to chat {}: {}", chat_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_literals() {
        assert_eq!(reply_text(&Outcome::Ignored), "Ignoring...");
        assert_eq!(
            reply_text(&Outcome::Stored {
                filename: "report.pdf".to_string()
            }),
            "report.pdf stored successfully."
        );
        assert_eq!(
            reply_text(&Outcome::Decrypted {
                password_name: "finance".to_string()
            }),
            "Decrypted with finance password"
        );
        assert_eq!(
            reply_text(&Outcome::UnknownPassword),
            "PDF is encrypted with unknown password"
        );
    }

    #[test]
    fn test_failures_share_the_generic_reply() {
        assert_eq!(reply_text(&Outcome::Malformed), reply_text(&Outcome::Failed));
        assert_eq!(reply_text(&Outcome::Failed), "Failed to process the document");
    }
}
