use std::collections::BTreeSet;
use std::net::IpAddr;
use serde::Serialize;
use super::event::{DnsEvent, DnsKind};

/// Splits events into `(queries, responses)`, each in input order.
pub fn partition(events: Vec<DnsEvent>) -> (Vec<DnsEvent>, Vec<DnsEvent>) {
    events.into_iter().partition(|e| e.kind == DnsKind::Query)
}

/// Addresses answered for `domain`, in response order.
///
/// Responses are linked to a name by string equality only; DNS message ids
/// are not consulted, so retries for the same name all contribute.
pub fn resolutions_for(responses: &[DnsEvent], domain: &str) -> Vec<IpAddr> {
    responses
        .iter()
        .filter(|e| e.kind == DnsKind::Response)
        .filter(|e| e.query_name.as_deref() == Some(domain))
        .filter_map(|e| e.resolved_address)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "address", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(IpAddr),
    NoAddressRecord,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Resolved(ip) => write!(f, "{}", ip),
            Resolution::NoAddressRecord => f.write_str("no address record"),
        }
    }
}

/// A response as seen by reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer<'a> {
    pub sequence_number: u64,
    pub query_name: Option<&'a str>,
    pub resolution: Resolution,
}

/// Every response with its outcome, including those without an address
/// record or without a query name.
pub fn answers(responses: &[DnsEvent]) -> Vec<Answer<'_>> {
    responses
        .iter()
        .filter(|e| e.kind == DnsKind::Response)
        .map(|e| Answer {
            sequence_number: e.sequence_number,
            query_name: e.query_name.as_deref(),
            resolution: match e.resolved_address {
                Some(ip) => Resolution::Resolved(ip),
                None => Resolution::NoAddressRecord,
            },
        })
        .collect()
}

/// Queries whose name never appears in any response.
pub fn unanswered_queries<'a>(queries: &'a [DnsEvent], responses: &[DnsEvent]) -> Vec<&'a DnsEvent> {
    let answered: BTreeSet<&str> = responses
        .iter()
        .filter_map(|e| e.query_name.as_deref())
        .collect();

    queries
        .iter()
        .filter(|q| match q.query_name.as_deref() {
            Some(name) => !answered.contains(name),
            None => true,
        })
        .collect()
}
