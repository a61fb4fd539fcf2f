use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::dns::{DNSPacket, DNSQuestion, DNSResourceClass, DNSResourceType, ResponseCode};

/// Key a cached answer is looked up by: the question's name (lowercased, so
/// case-insensitive matching doesn't depend on how a client capitalized its
/// query), type, and class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    qtype: DNSResourceType,
    qclass: DNSResourceClass,
}

impl CacheKey {
    fn from_question(question: &DNSQuestion) -> Self {
        Self {
            name: question.name().to_ascii_lowercase(),
            qtype: question.qtype,
            qclass: question.qclass,
        }
    }
}

struct CacheEntry {
    response: DNSPacket,
    expires_at: Instant,
    original_ttl: u32,
}

/// A TTL-bounded cache of upstream responses, keyed on the question.
/// Positive answers are cached for the minimum TTL across their answer RRs,
/// clamped to `[min_ttl, max_ttl]`. NXDOMAIN/SERVFAIL and any
/// truncated (`TC=1`) response are never cached, with one carve-out: an
/// NXDOMAIN answering a `SOA` query is cached as a negative entry, since
/// that's the shape a SOA-driven existence probe takes (spec.md §4.6).
///
/// Grounded on the teacher's `DashMap`-backed cache map, trimmed of its
/// redis persistence layer — entries live only as long as the process does.
pub struct RecursionCache {
    entries: DashMap<CacheKey, CacheEntry>,
    min_ttl: Duration,
    max_ttl: Duration,
}

impl RecursionCache {
    pub fn new(min_ttl: Duration, max_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            min_ttl,
            max_ttl,
        }
    }

    /// Returns a cached response for `question`, if any, with its answer
    /// TTLs adjusted downward for elapsed time (floor of one second, never
    /// negative).
    pub fn get(&self, question: &DNSQuestion) -> Option<DNSPacket> {
        let key = CacheKey::from_question(question);
        let entry = self.entries.get(&key)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }

        let remaining = entry.expires_at.saturating_duration_since(Instant::now());
        let adjusted_ttl = remaining.as_secs().max(1) as u32;
        let mut response = entry.response.clone();
        for rr in response
            .answers
            .iter_mut()
            .chain(response.authorities.iter_mut())
        {
            rr.ttl = adjusted_ttl;
        }
        let _ = entry.original_ttl;
        Some(response)
    }

    /// Stores `response` under `question`'s key, if it's cacheable.
    pub fn put(&self, question: &DNSQuestion, response: &DNSPacket) {
        let rcode = response.header.response_code();
        let is_negative_soa_probe =
            rcode == ResponseCode::NameError && question.qtype == DNSResourceType::SOA;

        if response.header.tc {
            return;
        }
        if rcode != ResponseCode::NoError && !is_negative_soa_probe {
            return;
        }

        let ttl = if is_negative_soa_probe {
            response
                .authorities
                .iter()
                .find(|rr| rr.rtype == DNSResourceType::SOA)
                .map(|rr| rr.ttl)
                .unwrap_or(self.min_ttl.as_secs() as u32)
        } else {
            match response.answers.iter().map(|rr| rr.ttl).min() {
                Some(ttl) => ttl,
                None => return,
            }
        };

        let clamped = (ttl as u64).clamp(self.min_ttl.as_secs(), self.max_ttl.as_secs());
        let key = CacheKey::from_question(question);
        self.entries.insert(
            key,
            CacheEntry {
                response: response.clone(),
                expires_at: Instant::now() + Duration::from_secs(clamped),
                original_ttl: ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{DNSHeader, DNSResource};

    fn question(qtype: DNSResourceType) -> DNSQuestion {
        DNSQuestion {
            labels: vec!["api".into(), "example".into(), "com".into()],
            qtype,
            qclass: DNSResourceClass::IN,
        }
    }

    fn answer_packet(ttl: u32) -> DNSPacket {
        let mut header = DNSHeader::default();
        header.qr = true;
        DNSPacket {
            header,
            questions: vec![question(DNSResourceType::A)],
            answers: vec![DNSResource {
                labels: vec!["api".into(), "example".into(), "com".into()],
                rtype: DNSResourceType::A,
                rclass: DNSResourceClass::IN,
                ttl,
                rdlength: 4,
                rdata: vec![10, 0, 0, 1],
                parsed_rdata: Some("10.0.0.1".into()),
                raw_class: None,
            }],
            authorities: vec![],
            additional: vec![],
        }
    }

    #[test]
    fn caches_and_returns_a_positive_answer() {
        let cache = RecursionCache::new(Duration::from_secs(1), Duration::from_secs(3600));
        let q = question(DNSResourceType::A);
        cache.put(&q, &answer_packet(300));
        let cached = cache.get(&q).unwrap();
        assert_eq!(cached.answers.len(), 1);
    }

    #[test]
    fn never_caches_a_truncated_response() {
        let cache = RecursionCache::new(Duration::from_secs(1), Duration::from_secs(3600));
        let q = question(DNSResourceType::A);
        let mut packet = answer_packet(300);
        packet.header.tc = true;
        cache.put(&q, &packet);
        assert!(cache.get(&q).is_none());
    }

    #[test]
    fn negative_caches_nxdomain_only_for_soa_queries() {
        let cache = RecursionCache::new(Duration::from_secs(1), Duration::from_secs(3600));

        let mut nxdomain = answer_packet(300);
        nxdomain.answers.clear();
        nxdomain.header.set_response_code(ResponseCode::NameError);
        nxdomain.authorities.push(DNSResource {
            labels: vec!["example".into(), "com".into()],
            rtype: DNSResourceType::SOA,
            rclass: DNSResourceClass::IN,
            ttl: 120,
            rdlength: 0,
            rdata: vec![],
            parsed_rdata: None,
            raw_class: None,
        });

        let soa_question = question(DNSResourceType::SOA);
        cache.put(&soa_question, &nxdomain);
        assert!(cache.get(&soa_question).is_some());

        let a_question = question(DNSResourceType::A);
        cache.put(&a_question, &nxdomain);
        assert!(cache.get(&a_question).is_none());
    }
}
