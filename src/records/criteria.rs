use crate::error::DnsError;
use crate::health::HealthStatus;

/// What a `q-` encoded discovery name filters on, decoded from its state
/// filter digit (`s0`..`s4`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum StateFilter {
    /// `s0` — no filtering, matches regardless of health.
    #[default]
    Any,
    /// `s1` — only instances currently `running`.
    Healthy,
    /// `s2` — every instance, same result set as `Any` but requested
    /// explicitly rather than defaulted.
    All,
    /// `s3` — only instances currently `failing`.
    Unhealthy,
    /// `s4` — every instance that is not `running` (`failing` or `unknown`).
    AllNonHealthy,
}

impl StateFilter {
    fn from_digit(d: u8) -> Option<Self> {
        match d {
            0 => Some(StateFilter::Any),
            1 => Some(StateFilter::Healthy),
            2 => Some(StateFilter::All),
            3 => Some(StateFilter::Unhealthy),
            4 => Some(StateFilter::AllNonHealthy),
            _ => None,
        }
    }

    pub fn allows(self, status: HealthStatus) -> bool {
        match self {
            StateFilter::Any | StateFilter::All => true,
            StateFilter::Healthy => status == HealthStatus::Running,
            StateFilter::Unhealthy => status == HealthStatus::Failing,
            StateFilter::AllNonHealthy => status != HealthStatus::Running,
        }
    }
}

/// How the `<group>` label of a discovery name should be matched against a
/// record's `instance_group`/`group_ids`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GroupEncoding {
    /// `g0` (or no `g` key at all) — literal match against `group_ids`.
    #[default]
    Literal,
    /// `g1` — the label is a short-name hash; match against
    /// [`super::store::short_name_hash`] of the instance group name.
    ShortHash,
}

/// A parsed `q-<enc>` criteria query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Criteria {
    pub group: Option<String>,
    pub network: Option<String>,
    pub deployment: Option<String>,
    pub state_filter: StateFilter,
    pub group_encoding: GroupEncoding,
    /// Set when the `<enc>` payload contained a key letter outside the
    /// recognized `{s, g}` alphabet. Such a query is well-formed but matches
    /// no records — it is not an error.
    pub matches_nothing: bool,
}

/// The result of parsing a discovery name: either a criteria-filtered
/// lookup, or a direct instance-ID lookup (the "short form").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoveryQuery {
    Criteria(Criteria),
    Instance {
        instance_name: String,
        group: String,
        network: String,
        deployment: String,
    },
}

/// Parses the portion of a query name preceding the matched zone suffix.
///
/// `prefix_labels` is every label before the zone (e.g. for
/// `q-s1.router.default.cf.bosh.` matched against zone `bosh.`, this is
/// `["q-s1", "router", "default", "cf"]`). Per spec.md §4.3 this must be
/// exactly four labels — anything else means the name isn't a discovery
/// name at all and the caller should fall back to a plain host lookup.
pub fn parse(prefix_labels: &[String]) -> Result<Option<DiscoveryQuery>, DnsError> {
    if prefix_labels.len() != 4 {
        return Ok(None);
    }

    let [first, group, network, deployment] = [
        prefix_labels[0].clone(),
        prefix_labels[1].clone(),
        prefix_labels[2].clone(),
        prefix_labels[3].clone(),
    ];

    if let Some(enc) = first.strip_prefix("q-") {
        let criteria = parse_encoding(enc)?;
        Ok(Some(DiscoveryQuery::Criteria(Criteria {
            group: Some(group),
            network: Some(network),
            deployment: Some(deployment),
            ..criteria
        })))
    } else {
        Ok(Some(DiscoveryQuery::Instance {
            instance_name: first,
            group,
            network,
            deployment,
        }))
    }
}

/// Parses the payload after the `q-` prefix into key/digit pairs. A
/// malformed pair (key with no digit, or vice versa) is the only condition
/// that raises [`DnsError::InvalidQuery`]; an unrecognized key letter is
/// accepted but marks the criteria as matching nothing.
fn parse_encoding(enc: &str) -> Result<Criteria, DnsError> {
    let chars: Vec<char> = enc.chars().collect();
    if chars.is_empty() || chars.len() % 2 != 0 {
        return Err(DnsError::InvalidQuery(format!(
            "malformed criteria encoding: {enc}"
        )));
    }

    let mut criteria = Criteria::default();
    for pair in chars.chunks_exact(2) {
        let (key, digit_char) = (pair[0], pair[1]);
        let digit = digit_char
            .to_digit(10)
            .ok_or_else(|| DnsError::InvalidQuery(format!("malformed criteria encoding: {enc}")))?
            as u8;

        match key {
            's' => {
                criteria.state_filter = StateFilter::from_digit(digit).unwrap_or_else(|| {
                    criteria.matches_nothing = true;
                    StateFilter::Any
                });
            }
            'g' => match digit {
                0 => criteria.group_encoding = GroupEncoding::Literal,
                1 => criteria.group_encoding = GroupEncoding::ShortHash,
                _ => criteria.matches_nothing = true,
            },
            _ => criteria.matches_nothing = true,
        }
    }

    Ok(criteria)
}
