pub mod config;
pub mod handlers;
pub mod router;
pub mod services;
pub mod transport;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::handlers::{DocumentHandler, IgnoreHandler};
use crate::router::{InboundMessage, Router};
use crate::services::access::AccessFilter;
use crate::services::intake::IntakeService;
use crate::services::notifier::ReplySink;
use crate::services::pdf::{DocumentCodec, LopdfCodec};
use crate::transport::FileFetcher;

/// Wire the intake pipeline to a transport's file fetcher and reply sink.
///
/// Route order matters: PDF uploads from allowed senders enter the intake
/// pipeline; any other message from an allowed sender gets the ignore
/// reply; everything else matches no route and is dropped silently.
pub fn build_router(
    config: &Config,
    fetcher: Arc<dyn FileFetcher>,
    replies: Arc<dyn ReplySink>,
) -> Router {
    build_router_with_codec(config, fetcher, replies, Arc::new(LopdfCodec))
}

pub fn build_router_with_codec(
    config: &Config,
    fetcher: Arc<dyn FileFetcher>,
    replies: Arc<dyn ReplySink>,
    codec: Arc<dyn DocumentCodec>,
) -> Router {
    let access = AccessFilter::new(config.allowed_users.iter().cloned());
    let intake = Arc::new(IntakeService::new(
        config.dest_dir.clone(),
        config.passwords.clone(),
        codec,
    ));
    let document_handler = Arc::new(DocumentHandler::new(intake, fetcher, Arc::clone(&replies)));
    let ignore_handler = Arc::new(IgnoreHandler::new(replies));

    let document_access = access.clone();
    Router::new()
        .route(
            move |message: &InboundMessage| {
                authorized(&document_access, message)
                    && message.document.as_ref().is_some_and(|d| d.is_pdf())
            },
            document_handler,
        )
        .route(
            move |message: &InboundMessage| authorized(&access, message),
            ignore_handler,
        )
}

fn authorized(access: &AccessFilter, message: &InboundMessage) -> bool {
    message
        .sender
        .as_deref()
        .is_some_and(|sender| access.authorize(sender))
}
