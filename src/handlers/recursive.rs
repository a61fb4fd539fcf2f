use std::sync::Arc;

use async_trait::async_trait;

use super::{authoritative_empty_response, Handler};
use crate::cache::RecursionCache;
use crate::dns::DNSPacket;
use crate::recursor::{ExchangeClient, RecursorPool};

/// Forwards a question to the configured recursor pool, consulting and
/// populating the recursion cache around the exchange.
///
/// Grounded on `failover_recursor_pool.go`'s caller, which wraps
/// `PerformStrategically` with a cache read/write and converts whatever
/// error comes back into the response's RCODE rather than letting it escape
/// to the listener (spec.md §7's propagation policy).
pub struct RecursiveHandler {
    pool: Arc<RecursorPool>,
    exchange: Arc<ExchangeClient>,
    cache: Option<Arc<RecursionCache>>,
}

impl RecursiveHandler {
    pub fn new(pool: Arc<RecursorPool>, exchange: Arc<ExchangeClient>, cache: Option<Arc<RecursionCache>>) -> Self {
        Self { pool, exchange, cache }
    }
}

#[async_trait]
impl Handler for RecursiveHandler {
    async fn serve(&self, request: &DNSPacket) -> DNSPacket {
        let question = match request.question() {
            Some(q) => q.clone(),
            None => return authoritative_empty_response(request, None, crate::dns::ResponseCode::NoError, false),
        };

        if let Some(cache) = &self.cache {
            if let Some(mut cached) = cache.get(&question) {
                cached.header.id = request.header.id;
                cached.header.ra = true;
                return cached;
            }
        }

        let exchange = self.exchange.clone();
        let query = request.clone();
        let result = self
            .pool
            .perform(move |recursor| {
                let exchange = exchange.clone();
                let query = query.clone();
                async move { exchange.exchange(&query, recursor).await }
            })
            .await;

        match result {
            Ok(mut response) => {
                if let Some(cache) = &self.cache {
                    cache.put(&question, &response);
                }
                response.header.id = request.header.id;
                response.header.ra = true;
                response
            }
            Err(e) => authoritative_empty_response(request, Some(&question), e.response_code(), false),
        }
    }
}
