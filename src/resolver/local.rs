use std::net::IpAddr;
use std::sync::Arc;

use crate::dns::{DNSHeader, DNSPacket, DNSQuestion, DNSResource, DNSResourceClass, DNSResourceType, ResponseCode};
use crate::error::DnsError;
use crate::health::{HealthChecker, HealthTable};
use crate::records::{criteria, RecordStore, ResolveOutcome};
use crate::shuffle::Shuffler;

/// Resolves a question against the authoritative records snapshot for one
/// zone, turning the matching set of IPs into A/AAAA answer records.
///
/// Grounded on teacher's `zone/authoritative.rs`, which played the same
/// role (look a name up in the store, build answer RRs from what's found)
/// against a BIND zone instead of a discovery-name criteria match.
pub struct LocalDomainResolver {
    store: Arc<RecordStore>,
    health: Arc<HealthTable>,
    checker: Option<Arc<HealthChecker>>,
}

impl LocalDomainResolver {
    pub fn new(store: Arc<RecordStore>, health: Arc<HealthTable>, checker: Option<Arc<HealthChecker>>) -> Self {
        Self { store, health, checker }
    }

    /// Resolves `question` within `zone_suffix` (the registered zone this
    /// resolver is authoritative for). `prefix_labels` is the question's
    /// name with the zone suffix's labels removed.
    ///
    /// Per spec.md §4.2/§9, only `A`/`AAAA`/`ANY` queries receive the
    /// actual matched address records; any other query type against a
    /// valid discovery name still resolves (NXDOMAIN vs NOERROR) but
    /// carries no answers — the caller is expected to apply that
    /// type-gating rule on top of this resolver's match result.
    pub async fn resolve(
        &self,
        question: &DNSQuestion,
        prefix_labels: &[String],
    ) -> Result<DNSPacket, DnsError> {
        let query = match criteria::parse(prefix_labels)? {
            Some(query) => query,
            None => {
                if let Some(expansions) = self.store.expand_alias(&question.name()) {
                    return self.resolve_alias_expansions(question, &expansions).await;
                }
                return Ok(self.empty_response(question, ResponseCode::NameError));
            }
        };

        let outcome = self.store.resolve(&query, &self.health);
        self.observe_referenced(&outcome.referenced_ips).await;

        Ok(self.response_for(question, outcome))
    }

    async fn resolve_alias_expansions(
        &self,
        question: &DNSQuestion,
        expansions: &[String],
    ) -> Result<DNSPacket, DnsError> {
        let mut ips = Vec::new();
        let mut matched_base_name = false;
        for name in expansions {
            let labels: Vec<String> = name.trim_end_matches('.').split('.').map(String::from).collect();
            if let Some(query) = criteria::parse(&labels)? {
                let outcome = self.store.resolve(&query, &self.health);
                self.observe_referenced(&outcome.referenced_ips).await;
                matched_base_name = matched_base_name || outcome.matched_base_name;
                ips.extend(outcome.ips);
            }
        }
        ips.sort();
        ips.dedup();
        Ok(self.response_for(
            question,
            ResolveOutcome {
                ips,
                referenced_ips: Vec::new(),
                matched_base_name,
            },
        ))
    }

    /// Registers every IP this query referenced with the health table,
    /// triggering a synchronous first-observation probe for any of them
    /// seen for the very first time (spec.md §3, §4.7). With health
    /// checking disabled (`checker` is `None`) the IPs are still registered
    /// so `effective_status`'s startup-grace bookkeeping has an entry to
    /// work with, just without ever being probed over the wire.
    async fn observe_referenced(&self, ips: &[IpAddr]) {
        for &ip in ips {
            if self.health.observe(ip) {
                if let Some(checker) = &self.checker {
                    checker.probe_now(ip).await;
                }
            }
        }
    }

    /// Turns a store lookup outcome into the final response: answers
    /// (shuffled) when anything survived the health gate, NOERROR with no
    /// answers when something matched the base name but the health gate
    /// excluded every candidate, and NXDOMAIN only when nothing matched the
    /// base name at all (spec.md §4.2 step 5).
    fn response_for(&self, question: &DNSQuestion, outcome: ResolveOutcome) -> DNSPacket {
        if outcome.ips.is_empty() {
            let rcode = if outcome.matched_base_name {
                ResponseCode::NoError
            } else {
                ResponseCode::NameError
            };
            return self.empty_response(question, rcode);
        }
        self.answer_response(question, &outcome.ips)
    }

    fn answer_response(&self, question: &DNSQuestion, ips: &[IpAddr]) -> DNSPacket {
        let mut answers: Vec<DNSResource> = ips
            .iter()
            .filter_map(|ip| answer_record(question, *ip))
            .collect();
        Shuffler::shuffle(&mut answers);
        self.base_response(question, ResponseCode::NoError, answers)
    }

    fn empty_response(&self, question: &DNSQuestion, rcode: ResponseCode) -> DNSPacket {
        self.base_response(question, rcode, Vec::new())
    }

    fn base_response(
        &self,
        question: &DNSQuestion,
        rcode: ResponseCode,
        answers: Vec<DNSResource>,
    ) -> DNSPacket {
        let mut header = DNSHeader {
            qr: true,
            aa: true,
            ra: true,
            ..Default::default()
        };
        header.set_response_code(rcode);
        DNSPacket {
            header,
            questions: vec![question.clone()],
            answers,
            authorities: Vec::new(),
            additional: Vec::new(),
        }
    }
}

fn answer_record(question: &DNSQuestion, ip: IpAddr) -> Option<DNSResource> {
    let (rtype, rdata) = match ip {
        IpAddr::V4(v4) if matches!(question.qtype, DNSResourceType::A | DNSResourceType::ANY) => {
            (DNSResourceType::A, v4.octets().to_vec())
        }
        IpAddr::V6(v6) if matches!(question.qtype, DNSResourceType::AAAA | DNSResourceType::ANY) => {
            (DNSResourceType::AAAA, v6.octets().to_vec())
        }
        _ => return None,
    };

    Some(DNSResource {
        labels: question.labels.clone(),
        rtype,
        rclass: DNSResourceClass::IN,
        ttl: 0,
        rdlength: rdata.len() as u16,
        parsed_rdata: Some(ip.to_string()),
        rdata,
        raw_class: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordSnapshot;
    use crate::records::Record;

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

    fn a_question(name: &str) -> DNSQuestion {
        DNSQuestion {
            labels: name.split('.').map(String::from).collect(),
            qtype: DNSResourceType::A,
            qclass: DNSResourceClass::IN,
        }
    }

    #[tokio::test]
    async fn resolves_a_matching_criteria_query() {
        let health = Arc::new(HealthTable::new(3));
        let resolver = LocalDomainResolver::new(store_with_one_record(), health, None);
        let question = a_question("q-s0.router.default.cf");
        let response = resolver
            .resolve(&question, &["q-s0".into(), "router".into(), "default".into(), "cf".into()])
            .await
            .unwrap();
        assert_eq!(response.answers.len(), 1);
        assert_eq!(response.header.response_code(), ResponseCode::NoError);
    }

    #[tokio::test]
    async fn returns_nxdomain_for_an_unmatched_query() {
        let health = Arc::new(HealthTable::new(3));
        let resolver = LocalDomainResolver::new(store_with_one_record(), health, None);
        let question = a_question("q-s0.other.default.cf");
        let response = resolver
            .resolve(&question, &["q-s0".into(), "other".into(), "default".into(), "cf".into()])
            .await
            .unwrap();
        assert_eq!(response.header.response_code(), ResponseCode::NameError);
    }

    /// A group that exists, but whose only instance is filtered out by the
    /// state filter, is NOERROR with no answers — not NXDOMAIN. Only a
    /// base name with no matching record at all is NXDOMAIN (spec.md §4.2
    /// step 5).
    #[tokio::test]
    async fn a_fully_health_filtered_group_is_noerror_not_nxdomain() {
        let health = Arc::new(HealthTable::new(3));
        health.record_failure("10.0.0.1".parse().unwrap());
        let resolver = LocalDomainResolver::new(store_with_one_record(), health, None);

        let question = a_question("q-s1.router.default.cf");
        let response = resolver
            .resolve(&question, &["q-s1".into(), "router".into(), "default".into(), "cf".into()])
            .await
            .unwrap();
        assert_eq!(response.header.response_code(), ResponseCode::NoError);
        assert!(response.answers.is_empty());
    }

    /// Referencing an IP for the first time registers it in the health
    /// table, so a later periodic sweep has something to probe — this is
    /// what makes the health checker non-inert in production.
    #[tokio::test]
    async fn resolving_a_query_registers_its_ips_with_the_health_table() {
        let health = Arc::new(HealthTable::new(3));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(!health.known_ips().contains(&ip));

        let resolver = LocalDomainResolver::new(store_with_one_record(), health.clone(), None);
        let question = a_question("q-s0.router.default.cf");
        resolver
            .resolve(&question, &["q-s0".into(), "router".into(), "default".into(), "cf".into()])
            .await
            .unwrap();

        assert!(health.known_ips().contains(&ip));
    }

    #[tokio::test]
    async fn an_unfiltered_query_still_registers_the_filtered_out_instance() {
        let store = Arc::new(RecordStore::new());
        store.replace(RecordSnapshot {
            records: vec![
                Record {
                    id: "a".into(),
                    group_ids: vec!["1".into()],
                    instance_group: "router".into(),
                    az: "z1".into(),
                    az_id: "1".into(),
                    network: "default".into(),
                    deployment: "cf".into(),
                    ip: "10.0.0.1".parse().unwrap(),
                    domain: "bosh.".into(),
                    agent_id: None,
                },
                Record {
                    id: "b".into(),
                    group_ids: vec!["1".into()],
                    instance_group: "router".into(),
                    az: "z1".into(),
                    az_id: "1".into(),
                    network: "default".into(),
                    deployment: "cf".into(),
                    ip: "10.0.0.2".parse().unwrap(),
                    domain: "bosh.".into(),
                    agent_id: None,
                },
            ],
            aliases: vec![],
        });
        let health = Arc::new(HealthTable::new(3));
        health.record_failure("10.0.0.2".parse().unwrap());
        let resolver = LocalDomainResolver::new(store, health.clone(), None);

        let question = a_question("q-s1.router.default.cf");
        resolver
            .resolve(&question, &["q-s1".into(), "router".into(), "default".into(), "cf".into()])
            .await
            .unwrap();

        assert!(health.known_ips().contains(&"10.0.0.1".parse().unwrap()));
        assert!(health.known_ips().contains(&"10.0.0.2".parse().unwrap()));
    }
}
