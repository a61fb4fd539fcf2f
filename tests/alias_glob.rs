mod common;

use std::sync::Arc;

use janus_dns::dns::ResponseCode;
use janus_dns::handlers::{DiscoveryHandler, Handler};
use janus_dns::health::HealthTable;
use janus_dns::records::{Alias, RecordSnapshot, RecordStore};
use janus_dns::resolver::LocalDomainResolver;

use common::{a_query, record_with_group};

/// A glob alias that expands to two discovery-name criteria queries
/// resolves to the set union of their matches, deduplicated by IP (one of
/// the instances, `a2`/`b2`, shares an address across both groups).
#[tokio::test]
async fn alias_glob_expands_to_the_deduplicated_union_of_matching_groups() {
    let store = Arc::new(RecordStore::new());
    store.replace(RecordSnapshot {
        records: vec![
            record_with_group("a1", "group-a", "10.0.0.1"),
            record_with_group("a2", "group-a", "10.0.0.9"),
            record_with_group("b1", "group-b", "10.0.0.2"),
            record_with_group("b2", "group-b", "10.0.0.9"),
        ],
        aliases: vec![Alias {
            pattern: "*.asterisk.alias.bosh".into(),
            expansions: vec![
                "q-s0.group-a.default.cf".into(),
                "q-s0.group-b.default.cf".into(),
            ],
        }],
    });

    let health = Arc::new(HealthTable::new(3));
    let resolver = LocalDomainResolver::new(store, health, None);
    let handler = DiscoveryHandler::new(resolver, "bosh.");

    let response = handler.serve(&a_query("somehost.asterisk.alias.bosh.")).await;
    assert_eq!(response.header.response_code(), ResponseCode::NoError);

    let mut ips: Vec<Vec<u8>> = response.answers.iter().map(|r| r.rdata.clone()).collect();
    ips.sort();
    assert_eq!(
        ips,
        vec![vec![10, 0, 0, 1], vec![10, 0, 0, 2], vec![10, 0, 0, 9]]
    );
}

/// A name that matches no alias pattern and has no matching criteria falls
/// through to NXDOMAIN rather than an alias expansion.
#[tokio::test]
async fn a_name_matching_no_alias_is_nxdomain() {
    let store = Arc::new(RecordStore::new());
    store.replace(RecordSnapshot {
        records: vec![record_with_group("a1", "group-a", "10.0.0.1")],
        aliases: vec![Alias {
            pattern: "*.asterisk.alias.bosh".into(),
            expansions: vec!["q-s0.group-a.default.cf".into()],
        }],
    });

    let health = Arc::new(HealthTable::new(3));
    let resolver = LocalDomainResolver::new(store, health, None);
    let handler = DiscoveryHandler::new(resolver, "bosh.");

    let response = handler.serve(&a_query("unrelated.bosh.")).await;
    assert_eq!(response.header.response_code(), ResponseCode::NameError);
}
