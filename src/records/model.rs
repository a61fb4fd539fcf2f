use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// A single instance record, as published in a records snapshot.
///
/// Field names match the snapshot schema verbatim (`record_keys`) so the
/// struct can be deserialized directly from the upstream JSON without a
/// translation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub group_ids: Vec<String>,
    pub instance_group: String,
    pub az: String,
    pub az_id: String,
    pub network: String,
    pub deployment: String,
    pub ip: IpAddr,
    pub domain: String,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl Record {
    /// `true` if `group` matches either this record's `instance_group` name
    /// or one of its numeric `group_ids`.
    pub fn matches_group(&self, group: &str) -> bool {
        self.instance_group == group || self.group_ids.iter().any(|g| g == group)
    }
}

/// A glob-style alias pattern and the discovery names it expands to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub pattern: String,
    pub expansions: Vec<String>,
}

/// The full snapshot published by the records source: every known instance
/// plus the alias table used to rewrite incoming query names before they
/// reach [`super::criteria`] parsing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordSnapshot {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub aliases: Vec<Alias>,
}
