mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use janus_dns::cache::RecursionCache;
use janus_dns::config::RecursorSelection;
use janus_dns::dns::{DNSResourceType, ResponseCode};
use janus_dns::handlers::{Handler, RecursiveHandler};
use janus_dns::recursor::{ExchangeClient, RecursorPool};

use common::{dns_query, spawn_nxdomain_recursor};

/// An NXDOMAIN answer to a SOA query is cached as a negative entry: a
/// second SOA query for the same name is served from the cache without
/// touching the upstream again, but a query of a different type for the
/// same name is a distinct cache key and still goes upstream.
#[tokio::test]
async fn nxdomain_is_cached_for_soa_queries_but_not_reused_across_qtypes() {
    let (addr, hits) = spawn_nxdomain_recursor().await;
    let pool = Arc::new(RecursorPool::new(vec![addr], RecursorSelection::Serial, 0));
    let exchange = Arc::new(ExchangeClient::new(Duration::from_secs(1)));
    let cache = Arc::new(RecursionCache::new(Duration::from_secs(60), Duration::from_secs(3600)));
    let handler = RecursiveHandler::new(pool, exchange, Some(cache));

    let soa_query = dns_query("nothere.example.com", DNSResourceType::SOA);
    let first = handler.serve(&soa_query).await;
    assert_eq!(first.header.response_code(), ResponseCode::NameError);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let second = handler.serve(&soa_query).await;
    assert_eq!(second.header.response_code(), ResponseCode::NameError);
    assert_eq!(
        hits.load(Ordering::SeqCst),
        1,
        "a repeat SOA query should be served from the negative cache"
    );

    let a_query = dns_query("nothere.example.com", DNSResourceType::A);
    let third = handler.serve(&a_query).await;
    assert_eq!(third.header.response_code(), ResponseCode::NameError);
    assert_eq!(
        hits.load(Ordering::SeqCst),
        2,
        "an A query is a different cache key and must still reach the upstream"
    );
}
