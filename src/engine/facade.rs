use std::collections::BTreeSet;
use std::net::IpAddr;
use log::{debug, info, warn};
use serde::Serialize;
use crate::capture::{MacAddress, PacketRecord, Protocol};
use crate::config::AnalysisConfig;
use crate::error::{Diagnostic, RecordError};
use crate::{ArtifactError, Result};
use super::aggregate::{aggregate, Statistics};
use super::dhcp::{DhcpTransactions, TransactionKeying};
use super::dns::{self, Answer};
use super::event::{DhcpEvent, DnsEvent};
use super::extract::{self, Extracted};

/// Everything one run produced. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineResult {
    pub dhcp_events: Vec<DhcpEvent>,
    pub dns_queries: Vec<DnsEvent>,
    pub dns_responses: Vec<DnsEvent>,
    pub unique_domains: BTreeSet<String>,
    #[serde(rename = "all_ip_addresses")]
    pub all_addresses: BTreeSet<IpAddr>,
    pub all_mac_addresses: BTreeSet<MacAddress>,
}

impl EngineResult {
    pub fn transactions(&self, keying: TransactionKeying) -> DhcpTransactions<'_> {
        DhcpTransactions::group(&self.dhcp_events, keying)
    }

    pub fn resolutions_for(&self, domain: &str) -> Vec<IpAddr> {
        dns::resolutions_for(&self.dns_responses, domain)
    }

    pub fn answers(&self) -> Vec<Answer<'_>> {
        dns::answers(&self.dns_responses)
    }

    pub fn unanswered_queries(&self) -> Vec<&DnsEvent> {
        dns::unanswered_queries(&self.dns_queries, &self.dns_responses)
    }

    pub fn dns_events(&self) -> impl Iterator<Item = &DnsEvent> {
        self.dns_queries.iter().chain(self.dns_responses.iter())
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::compute(&self.dhcp_events, self.dns_events())
    }
}

/// A result together with the per-record issues met while building it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub result: EngineResult,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunOutcome {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn dropped_records(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.dropped_record()).count()
    }
}

pub struct Engine {
    keying: TransactionKeying,
}

impl Engine {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            keying: config.transaction_keying,
        }
    }

    pub fn keying(&self) -> TransactionKeying {
        self.keying
    }

    /// Runs both streams on the calling thread.
    pub fn run<D, N>(&self, dhcp_stream: D, dns_stream: N) -> Result<RunOutcome>
    where
        D: IntoIterator,
        D::Item: PacketRecord,
        N: IntoIterator,
        N::Item: PacketRecord,
    {
        let (dhcp_events, mut diagnostics) =
            extract_stream(Protocol::Dhcp, dhcp_stream, |r| extract::extract_dhcp(r));
        let (dns_events, dns_diagnostics) =
            extract_stream(Protocol::Dns, dns_stream, |r| extract::extract_dns(r));
        diagnostics.extend(dns_diagnostics);

        assemble(dhcp_events, dns_events, diagnostics)
    }

    /// Runs each stream's extraction on its own blocking worker and joins
    /// both before aggregation.
    pub async fn run_parallel<D, N>(&self, dhcp_stream: Vec<D>, dns_stream: Vec<N>) -> Result<RunOutcome>
    where
        D: PacketRecord + Send + 'static,
        N: PacketRecord + Send + 'static,
    {
        let dhcp_worker = tokio::task::spawn_blocking(move || {
            extract_stream(Protocol::Dhcp, dhcp_stream, |r| extract::extract_dhcp(r))
        });
        let dns_worker = tokio::task::spawn_blocking(move || {
            extract_stream(Protocol::Dns, dns_stream, |r| extract::extract_dns(r))
        });

        let (dhcp, dns) = tokio::try_join!(dhcp_worker, dns_worker)
            .map_err(|e| ArtifactError::Worker(format!("Extraction worker failed: {}", e)))?;

        let (dhcp_events, mut diagnostics) = dhcp;
        let (dns_events, dns_diagnostics) = dns;
        diagnostics.extend(dns_diagnostics);

        assemble(dhcp_events, dns_events, diagnostics)
    }
}

fn extract_stream<I, E, F>(protocol: Protocol, records: I, extract_fn: F) -> (Vec<E>, Vec<Diagnostic>)
where
    I: IntoIterator,
    I::Item: PacketRecord,
    F: Fn(&I::Item) -> std::result::Result<Extracted<E>, RecordError>,
{
    let mut events = Vec::new();
    let mut diagnostics = Vec::new();

    for (position, record) in records.into_iter().enumerate() {
        let sequence_number = extract::sequence_hint(&record);

        match extract_fn(&record) {
            Ok(extracted) => {
                diagnostics.extend(extracted.warnings.into_iter().map(|error| Diagnostic {
                    protocol,
                    position,
                    sequence_number,
                    error,
                }));
                events.push(extracted.event);
            }
            Err(error) => {
                warn!("Dropping {} record at position {}: {}", protocol, position, error);
                diagnostics.push(Diagnostic {
                    protocol,
                    position,
                    sequence_number,
                    error,
                });
            }
        }
    }

    debug!(
        "{} stream: {} events extracted, {} diagnostics",
        protocol,
        events.len(),
        diagnostics.len()
    );
    (events, diagnostics)
}

fn assemble(dhcp_events: Vec<DhcpEvent>, dns_events: Vec<DnsEvent>, diagnostics: Vec<Diagnostic>) -> Result<RunOutcome> {
    if dhcp_events.is_empty() {
        return Err(ArtifactError::EmptyStream { protocol: Protocol::Dhcp });
    }
    if dns_events.is_empty() {
        return Err(ArtifactError::EmptyStream { protocol: Protocol::Dns });
    }

    let summary = aggregate(&dhcp_events, &dns_events);
    let (dns_queries, dns_responses) = dns::partition(dns_events);

    info!(
        "Extracted {} DHCP events, {} DNS queries, {} DNS responses ({} diagnostics)",
        dhcp_events.len(),
        dns_queries.len(),
        dns_responses.len(),
        diagnostics.len()
    );

    Ok(RunOutcome {
        result: EngineResult {
            dhcp_events,
            dns_queries,
            dns_responses,
            unique_domains: summary.domains,
            all_addresses: summary.addresses,
            all_mac_addresses: summary.mac_addresses,
        },
        diagnostics,
    })
}
