use async_trait::async_trait;

use super::{empty_response, Handler};
use crate::dns::DNSPacket;
use crate::resolver::LocalDomainResolver;

/// Serves a zone backed by the local instance-records store.
///
/// Grounded directly on `discovery_handler.go`: look the question up
/// against the local domain, fall through to NXDOMAIN/NOERROR-with-no-answer
/// for any non-address qtype. Here that qtype gating already happens inside
/// [`LocalDomainResolver::resolve`] (an A/AAAA/ANY-only `answer_record`
/// filter that still reports the right existence RCODE), so this handler is
/// just the label-stripping adapter between the mux and the resolver.
pub struct DiscoveryHandler {
    resolver: LocalDomainResolver,
    zone_labels: Vec<String>,
}

impl DiscoveryHandler {
    pub fn new(resolver: LocalDomainResolver, zone: &str) -> Self {
        let zone_labels = zone
            .trim_end_matches('.')
            .split('.')
            .filter(|label| !label.is_empty())
            .map(|label| label.to_ascii_lowercase())
            .collect();
        Self { resolver, zone_labels }
    }
}

#[async_trait]
impl Handler for DiscoveryHandler {
    async fn serve(&self, request: &DNSPacket) -> DNSPacket {
        let question = match request.question() {
            Some(q) => q.clone(),
            None => return empty_response(request, None, crate::dns::ResponseCode::NoError),
        };

        let total = question.labels.len();
        let prefix_end = total.saturating_sub(self.zone_labels.len());
        let prefix_labels = question.labels[..prefix_end].to_vec();

        match self.resolver.resolve(&question, &prefix_labels).await {
            Ok(response) => response,
            Err(e) => empty_response(request, Some(&question), e.response_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{DNSHeader, DNSQuestion, DNSResourceClass, DNSResourceType, ResponseCode};
    use crate::health::HealthTable;
    use crate::records::{Record, RecordSnapshot, RecordStore};
    use std::sync::Arc;

    fn store_with_one_record() -> Arc<RecordStore> {
        let store = Arc::new(RecordStore::new());
        store.replace(RecordSnapshot {
            records: vec![Record {
                id: "abc".into(),
                group_ids: vec!["1".into()],
                instance_group: "router".into(),
                az: "z1".into(),
                az_id: "1".into(),
                network: "default".into(),
                deployment: "cf".into(),
                ip: "10.0.0.1".parse().unwrap(),
                domain: "bosh.".into(),
                agent_id: None,
            }],
            aliases: vec![],
        });
        store
    }

    fn request_for(name: &str) -> DNSPacket {
        DNSPacket {
            header: DNSHeader { id: 1, rd: true, ..Default::default() },
            questions: vec![DNSQuestion {
                labels: name.split('.').map(String::from).collect(),
                qtype: DNSResourceType::A,
                qclass: DNSResourceClass::IN,
            }],
            answers: Vec::new(),
            authorities: Vec::new(),
            additional: Vec::new(),
        }
    }

    #[tokio::test]
    async fn strips_the_zone_suffix_before_parsing_criteria() {
        let resolver = LocalDomainResolver::new(store_with_one_record(), Arc::new(HealthTable::new(3)), None);
        let handler = DiscoveryHandler::new(resolver, "bosh.");
        let request = request_for("q-s0.router.default.cf.bosh.");
        let response = handler.serve(&request).await;
        assert_eq!(response.header.response_code(), ResponseCode::NoError);
        assert_eq!(response.answers.len(), 1);
    }
}
