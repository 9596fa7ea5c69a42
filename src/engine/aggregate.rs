use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use serde::Serialize;
use crate::capture::MacAddress;
use super::dhcp::classify;
use super::event::{DhcpEvent, DhcpMessageType, DnsEvent, DnsKind};

/// Deduplicated participants of a run. Every set is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub domains: BTreeSet<String>,
    pub addresses: BTreeSet<IpAddr>,
    pub mac_addresses: BTreeSet<MacAddress>,
}

/// Pure reduction over both event sequences; input order does not matter.
///
/// Domains come from queries only, MAC addresses from the DHCP link layer
/// only, addresses from both protocols' source and destination.
pub fn aggregate<'a>(
    dhcp: impl IntoIterator<Item = &'a DhcpEvent>,
    dns: impl IntoIterator<Item = &'a DnsEvent>,
) -> Aggregate {
    let mut result = Aggregate::default();

    for event in dhcp {
        result.addresses.insert(event.source_address);
        result.addresses.insert(event.dest_address);
        result.mac_addresses.insert(event.source_mac);
        result.mac_addresses.insert(event.dest_mac);
    }

    for event in dns {
        result.addresses.insert(event.source_address);
        result.addresses.insert(event.dest_address);
        if event.kind == DnsKind::Query {
            if let Some(name) = &event.query_name {
                result.domains.insert(name.clone());
            }
        }
    }

    result
}

/// Five-number summary plus mean of packet sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeSummary {
    pub count: usize,
    pub min: u32,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: u32,
    pub mean: f64,
}

impl SizeSummary {
    pub fn from_sizes(sizes: impl IntoIterator<Item = u32>) -> Option<Self> {
        let mut sizes: Vec<u32> = sizes.into_iter().collect();
        if sizes.is_empty() {
            return None;
        }
        sizes.sort_unstable();

        let total: u64 = sizes.iter().map(|&s| u64::from(s)).sum();
        Some(SizeSummary {
            count: sizes.len(),
            min: sizes[0],
            q1: quantile(&sizes, 0.25),
            median: quantile(&sizes, 0.5),
            q3: quantile(&sizes, 0.75),
            max: sizes[sizes.len() - 1],
            mean: total as f64 / sizes.len() as f64,
        })
    }
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn quantile(sorted: &[u32], p: f64) -> f64 {
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    f64::from(sorted[lower]) + (f64::from(sorted[upper]) - f64::from(sorted[lower])) * fraction
}

/// Frequency counts derived from the event sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub dhcp_packets: usize,
    pub dns_queries: usize,
    pub dns_responses: usize,
    /// Queries per domain name.
    pub domain_frequency: BTreeMap<String, usize>,
    /// Every DNS message carrying a query name, by query type (`?` when the
    /// type is missing).
    pub query_type_frequency: BTreeMap<String, usize>,
    pub message_type_frequency: BTreeMap<DhcpMessageType, usize>,
    pub dhcp_sizes: Option<SizeSummary>,
    pub dns_sizes: Option<SizeSummary>,
}

impl Statistics {
    pub fn compute<'a>(
        dhcp: impl IntoIterator<Item = &'a DhcpEvent>,
        dns: impl IntoIterator<Item = &'a DnsEvent>,
    ) -> Self {
        let mut stats = Statistics::default();
        let mut dhcp_sizes = Vec::new();
        let mut dns_sizes = Vec::new();

        for (message_type, events) in classify(dhcp) {
            stats.dhcp_packets += events.len();
            stats.message_type_frequency.insert(message_type, events.len());
            dhcp_sizes.extend(events.iter().map(|e| e.byte_length));
        }

        for event in dns {
            dns_sizes.push(event.byte_length);
            match event.kind {
                DnsKind::Query => stats.dns_queries += 1,
                DnsKind::Response => stats.dns_responses += 1,
            }

            let Some(name) = &event.query_name else {
                continue;
            };
            let query_type = event.query_type.clone().unwrap_or_else(|| "?".to_string());
            *stats.query_type_frequency.entry(query_type).or_insert(0) += 1;

            if event.kind == DnsKind::Query {
                *stats.domain_frequency.entry(name.clone()).or_insert(0) += 1;
            }
        }

        stats.dhcp_sizes = SizeSummary::from_sizes(dhcp_sizes);
        stats.dns_sizes = SizeSummary::from_sizes(dns_sizes);
        stats
    }

    /// Domains by descending query count, ties by name.
    pub fn top_domains(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .domain_frequency
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}
