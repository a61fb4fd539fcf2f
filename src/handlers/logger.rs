use std::time::Instant;

use async_trait::async_trait;

use super::Handler;
use crate::dns::DNSPacket;

/// Wraps another handler and logs the request/response pair around it.
///
/// Grounded on `request_logger_handler.go`: a decorator that owns its child
/// handler by value (here, `Arc<dyn Handler>`), logs before dispatch, times
/// the call, and logs the outcome — the "decorator wraps a base handler by
/// value" shape spec.md §9 calls for, rather than a subclassing hierarchy.
pub struct RequestLoggerHandler {
    inner: std::sync::Arc<dyn Handler>,
}

impl RequestLoggerHandler {
    pub fn new(inner: std::sync::Arc<dyn Handler>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Handler for RequestLoggerHandler {
    async fn serve(&self, request: &DNSPacket) -> DNSPacket {
        let name = request.question().map(|q| q.name()).unwrap_or_default();
        let qtype = request.question().map(|q| q.qtype);
        tracing::debug!(id = request.header.id, %name, ?qtype, "received query");

        let start = Instant::now();
        let response = self.inner.serve(request).await;
        let elapsed = start.elapsed();

        tracing::debug!(
            id = request.header.id,
            %name,
            rcode = ?response.header.response_code(),
            answers = response.answers.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "replied to query"
        );

        response
    }
}
