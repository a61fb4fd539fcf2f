use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::criteria::{Criteria, DiscoveryQuery, GroupEncoding};
use super::model::{Record, RecordSnapshot};
use crate::error::DnsError;
use crate::health::{HealthStatus, HealthTable};

/// The result of [`RecordStore::resolve`]: the IPs that survive the full
/// match (criteria + health gate), the pre-health-gate candidate set a
/// caller should register with the health checker, and whether anything
/// matched the base name at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub ips: Vec<IpAddr>,
    pub referenced_ips: Vec<IpAddr>,
    pub matched_base_name: bool,
}

/// Lowercase, unpadded RFC4648 base32 of the 64-bit FNV-1a hash of `name`,
/// truncated to eight characters. Used to match the `g1`-encoded short-name
/// form of a `<group>` discovery label against a record's `instance_group`.
///
/// Grounded on the FNV-1a used throughout teacher's NSEC3 hashing (same
/// hash-then-base32-encode shape, different hash and truncation target —
/// see [`crate::DESIGN`]'s Open Question notes).
pub fn short_name_hash(name: &str) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in name.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    let encoded = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &hash.to_be_bytes());
    encoded.to_lowercase().chars().take(8).collect()
}

/// Holds the most recently loaded records snapshot behind a lock, swapped
/// wholesale on reload rather than mutated in place — the same
/// copy-on-write pattern the teacher's zone store used for BIND zone
/// reloads, adapted to a JSON snapshot instead of a zone file.
pub struct RecordStore {
    snapshot: RwLock<Arc<RecordSnapshot>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RecordSnapshot::default())),
        }
    }

    pub fn load_from_file(&self, path: &Path) -> Result<(), DnsError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DnsError::InternalError(format!("reading {}: {e}", path.display())))?;
        let snapshot: RecordSnapshot = serde_json::from_str(&contents)
            .map_err(|e| DnsError::InternalError(format!("parsing {}: {e}", path.display())))?;
        self.replace(snapshot);
        Ok(())
    }

    pub fn replace(&self, snapshot: RecordSnapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }

    /// Merges an alias file (a JSON array of `{pattern, expansions}`) into
    /// the current snapshot's alias table, replacing any existing alias
    /// with the same pattern. Separate from [`Self::load_from_file`]: alias
    /// files are static configuration, not part of the live records
    /// snapshot the instance-records loader publishes.
    pub fn load_aliases_from_file(&self, path: &Path) -> Result<(), DnsError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DnsError::InternalError(format!("reading {}: {e}", path.display())))?;
        let loaded: Vec<super::model::Alias> = serde_json::from_str(&contents)
            .map_err(|e| DnsError::InternalError(format!("parsing {}: {e}", path.display())))?;

        let mut snapshot = (*self.snapshot()).clone();
        for alias in loaded {
            snapshot.aliases.retain(|existing| existing.pattern != alias.pattern);
            snapshot.aliases.push(alias);
        }
        self.replace(snapshot);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<RecordSnapshot> {
        self.snapshot.read().clone()
    }

    /// Resolves a parsed discovery query to the set of matching IPs,
    /// applying the state filter through `health`.
    ///
    /// `referenced_ips` carries every IP that matched the base criteria
    /// (group/network/deployment or instance lookup) *before* the health
    /// gate was applied — this is the set a caller should register with the
    /// health checker, since all of them were referenced by the query even
    /// if the state filter goes on to exclude some (spec.md §4.7: "the set
    /// of IPs currently referenced by any … query"). `matched_base_name`
    /// tells the caller whether any record matched the base name at all, so
    /// it can distinguish NXDOMAIN from a NOERROR-with-no-answers response
    /// when every match gets filtered out by the state filter (spec.md
    /// §4.2 step 5).
    pub fn resolve(&self, query: &DiscoveryQuery, health: &HealthTable) -> ResolveOutcome {
        let snapshot = self.snapshot();
        match query {
            DiscoveryQuery::Criteria(criteria) => {
                let referenced_ips: Vec<IpAddr> = snapshot
                    .records
                    .iter()
                    .filter(|r| matches_criteria(r, criteria))
                    .map(|r| r.ip)
                    .collect();
                let ips = referenced_ips
                    .iter()
                    .copied()
                    .filter(|ip| criteria.state_filter.allows(health.effective_status(*ip)))
                    .collect();
                ResolveOutcome {
                    matched_base_name: !referenced_ips.is_empty(),
                    referenced_ips,
                    ips,
                }
            }
            DiscoveryQuery::Instance {
                instance_name,
                group,
                network,
                deployment,
            } => {
                let ips: Vec<IpAddr> = snapshot
                    .records
                    .iter()
                    .filter(|r| {
                        &r.id == instance_name
                            && r.matches_group(group)
                            && &r.network == network
                            && &r.deployment == deployment
                    })
                    .map(|r| r.ip)
                    .collect();
                ResolveOutcome {
                    matched_base_name: !ips.is_empty(),
                    referenced_ips: ips.clone(),
                    ips,
                }
            }
        }
    }

    /// Expands a host name against the alias table, returning the
    /// discovery names it rewrites to, if any glob pattern matches.
    pub fn expand_alias(&self, name: &str) -> Option<Vec<String>> {
        let snapshot = self.snapshot();
        snapshot
            .aliases
            .iter()
            .find(|alias| glob_match(&alias.pattern, name))
            .map(|alias| alias.expansions.clone())
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_criteria(record: &Record, criteria: &Criteria) -> bool {
    if criteria.matches_nothing {
        return false;
    }
    if let Some(group) = &criteria.group {
        let matched = match criteria.group_encoding {
            GroupEncoding::Literal => record.matches_group(group),
            GroupEncoding::ShortHash => short_name_hash(&record.instance_group) == *group,
        };
        if !matched {
            return false;
        }
    }
    if let Some(network) = &criteria.network {
        if &record.network != network {
            return false;
        }
    }
    if let Some(deployment) = &criteria.deployment {
        if &record.deployment != deployment {
            return false;
        }
    }
    true
}

/// Minimal `*`-only glob matcher for alias patterns (spec.md doesn't call
/// for anything richer than shell-style wildcards here).
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let mut parts = pattern.split('*');
    let mut pos = 0;
    let first = parts.next().unwrap_or("");
    if !candidate[pos..].starts_with(first) {
        return false;
    }
    pos += first.len();

    let mut last_was_anchored_to_end = pattern.ends_with(first) && !pattern.contains('*');
    for (i, part) in parts.enumerate() {
        if part.is_empty() {
            continue;
        }
        if let Some(found) = candidate[pos..].find(part) {
            pos += found + part.len();
            last_was_anchored_to_end = true;
        } else {
            return false;
        }
        let _ = i;
    }
    if !pattern.ends_with('*') {
        last_was_anchored_to_end && pos == candidate.len()
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::criteria::StateFilter;

    fn sample_record(id: &str, group: &str, ip: &str) -> Record {
        Record {
            id: id.into(),
            group_ids: vec!["7".into()],
            instance_group: group.into(),
            az: "z1".into(),
            az_id: "1".into(),
            network: "default".into(),
            deployment: "cf".into(),
            ip: ip.parse().unwrap(),
            domain: "bosh.".into(),
            agent_id: None,
        }
    }

    #[test]
    fn resolves_criteria_by_group_and_health() {
        let store = RecordStore::new();
        store.replace(RecordSnapshot {
            records: vec![
                sample_record("a", "router", "10.0.0.1"),
                sample_record("b", "router", "10.0.0.2"),
            ],
            aliases: vec![],
        });
        let health = HealthTable::new(3);
        health.record_success(
            "10.0.0.1".parse().unwrap(),
            &serde_json::from_str(r#"{"state":"running"}"#).unwrap(),
        );

        let criteria = Criteria {
            group: Some("router".into()),
            network: Some("default".into()),
            deployment: Some("cf".into()),
            state_filter: StateFilter::Healthy,
            ..Default::default()
        };
        let outcome = store.resolve(&DiscoveryQuery::Criteria(criteria), &health);
        assert_eq!(outcome.ips, vec!["10.0.0.1".parse::<IpAddr>().unwrap()]);
        assert!(outcome.matched_base_name);
        let mut referenced = outcome.referenced_ips.clone();
        referenced.sort();
        assert_eq!(
            referenced,
            vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "10.0.0.2".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn a_fully_health_filtered_match_still_reports_matched_base_name() {
        let store = RecordStore::new();
        store.replace(RecordSnapshot {
            records: vec![sample_record("a", "router", "10.0.0.1")],
            aliases: vec![],
        });
        let health = HealthTable::new(3);
        health.record_failure("10.0.0.1".parse().unwrap());

        let criteria = Criteria {
            group: Some("router".into()),
            network: Some("default".into()),
            deployment: Some("cf".into()),
            state_filter: StateFilter::Healthy,
            ..Default::default()
        };
        let outcome = store.resolve(&DiscoveryQuery::Criteria(criteria), &health);
        assert!(outcome.ips.is_empty());
        assert!(outcome.matched_base_name);
    }

    #[test]
    fn no_matching_group_at_all_reports_unmatched_base_name() {
        let store = RecordStore::new();
        store.replace(RecordSnapshot {
            records: vec![sample_record("a", "router", "10.0.0.1")],
            aliases: vec![],
        });
        let health = HealthTable::new(3);
        let criteria = Criteria {
            group: Some("nonexistent".into()),
            network: Some("default".into()),
            deployment: Some("cf".into()),
            ..Default::default()
        };
        let outcome = store.resolve(&DiscoveryQuery::Criteria(criteria), &health);
        assert!(outcome.ips.is_empty());
        assert!(!outcome.matched_base_name);
    }

    #[test]
    fn short_name_hash_is_deterministic() {
        assert_eq!(short_name_hash("router"), short_name_hash("router"));
        assert_ne!(short_name_hash("router"), short_name_hash("other"));
    }

    #[test]
    fn glob_matches_a_leading_wildcard() {
        assert!(glob_match("*.example.com", "api.example.com"));
        assert!(!glob_match("*.example.com", "api.example.net"));
    }
}
