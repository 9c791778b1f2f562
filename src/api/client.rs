use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::api::document::Document;
use crate::api::transport::{DocumentTransport, HttpTransport};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::throttle::{Dispatcher, RateGate, SubmissionHandle};

/// Rate-limited client for the document-creation API.
///
/// At most `request_limit` documents are sent per window; further calls queue until the
/// window snaps back to full.
#[derive(Clone)]
pub struct CrptApi {
    dispatcher: Dispatcher,
    transport: Arc<dyn DocumentTransport>,
}

impl CrptApi {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Self::with_transport(config.request_limit, config.refill_interval(), transport)
    }

    pub fn with_transport(
        request_limit: usize,
        refill_interval: Duration,
        transport: Arc<dyn DocumentTransport>,
    ) -> Result<Self> {
        let gate = RateGate::new(request_limit, refill_interval)?;
        info!(
            "CrptApi ready: {} requests per {:?}",
            request_limit, refill_interval
        );

        Ok(Self {
            dispatcher: Dispatcher::new(gate),
            transport,
        })
    }

    /// Queue `document` for creation. Encoding happens once the request is admitted.
    pub fn create_document(
        &self,
        document: Document,
        signature: impl Into<String>,
    ) -> SubmissionHandle<(), AppError> {
        let transport = self.transport.clone();
        let signature = signature.into();

        self.dispatcher.submit(move || async move {
            let body = serde_json::to_string(&document).map_err(|e| {
                error!("Error while encoding document {}: {}", document.doc_id, e);
                AppError::Serialize(e)
            })?;
            transport.send(body, &signature).await
        })
    }

    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
