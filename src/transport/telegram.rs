use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use crate::router::{DocumentAttachment, InboundMessage, Router};
use crate::services::notifier::ReplySink;
use crate::transport::FileFetcher;

/// Long-poll timeout passed to getUpdates. The HTTP request timeout adds
/// headroom on top so the server side always wins.
const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub document: Option<Document>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct File {
    file_path: Option<String>,
}

/// Thin Telegram Bot API client: getUpdates long polling, file download,
/// sendMessage. Everything the rest of the service needs from it goes
/// through the `FileFetcher` and `ReplySink` traits.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    file_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_server("https://api.telegram.org", token)
    }

    /// Point the client at a self-hosted Bot API server.
    pub fn with_server(server: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{server}/bot{token}"),
            file_url: format!("{server}/file/bot{token}"),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response: ApiResponse<Vec<Update>> = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
            ])
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.ok {
            bail!(
                "getUpdates rejected: {}",
                response.description.unwrap_or_default()
            );
        }
        Ok(response.result.unwrap_or_default())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response: ApiResponse<serde_json::Value> = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.ok {
            bail!(
                "sendMessage rejected: {}",
                response.description.unwrap_or_default()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ReplySink for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await
    }
}

#[async_trait]
impl FileFetcher for TelegramClient {
    async fn fetch(&self, file_id: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let response: ApiResponse<File> = self
            .http
            .get(self.method_url("getFile"))
            .query(&[("file_id", file_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let file_path = response
            .result
            .and_then(|f| f.file_path)
            .context("getFile returned no file_path")?;

        let stream = self
            .http
            .get(format!("{}/{}", self.file_url, file_path))
            .send()
            .await?
            .error_for_status()?
            .bytes_stream()
            .map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }
}

/// Map a wire message onto the router's transport-independent shape. A
/// document without a filename is treated as a plain message and falls
/// through to the ignore route.
pub fn to_inbound(message: Message) -> InboundMessage {
    let document = message.document.and_then(|d| {
        let file_name = d.file_name?;
        Some(DocumentAttachment {
            file_id: d.file_id,
            file_name,
            mime_type: d.mime_type,
        })
    });
    InboundMessage {
        sender: message.from.and_then(|u| u.username),
        chat_id: message.chat.id,
        document,
    }
}

/// getUpdates loop: each update is dispatched on its own task, so one slow
/// download or decryption blocks only that upload. Poll failures are logged
/// and retried; only the shutdown signal ends the loop.
pub async fn run_polling(
    client: Arc<TelegramClient>,
    router: Arc<Router>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut offset = 0i64;
    info!("📡 Long polling started");
    loop {
        let updates = tokio::select! {
            result = client.get_updates(offset) => result,
            changed = shutdown.changed() => {
                // A dropped sender means the process is going down too.
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(message) = update.message else {
                        continue;
                    };
                    let inbound = to_inbound(message);
                    let router = Arc::clone(&router);
                    tokio::spawn(async move {
                        if !router.dispatch(&inbound).await {
                            debug!("Dropped message from unauthorized sender on chat {}", inbound.chat_id);
                        }
                    });
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
    info!("📡 Long polling stopped");
}
