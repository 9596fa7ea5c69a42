use std::fmt;
use crate::engine::{EngineResult, Statistics, TransactionKeying};
use crate::error::Diagnostic;
use crate::utils::format_timestamp;

const RULE_WIDTH: usize = 85;

/// Plain-text rendering of a run, in the order an analyst reads it: DHCP
/// exchange, DNS activity, participants, statistics, diagnostics.
pub struct Report<'a> {
    pub result: &'a EngineResult,
    pub statistics: &'a Statistics,
    pub diagnostics: &'a [Diagnostic],
    pub keying: TransactionKeying,
    pub session_id: Option<&'a str>,
}

impl<'a> Report<'a> {
    pub fn new(result: &'a EngineResult, statistics: &'a Statistics, diagnostics: &'a [Diagnostic]) -> Self {
        Self {
            result,
            statistics,
            diagnostics,
            keying: TransactionKeying::default(),
            session_id: None,
        }
    }

    pub fn with_keying(mut self, keying: TransactionKeying) -> Self {
        self.keying = keying;
        self
    }

    pub fn with_session_id(mut self, session_id: &'a str) -> Self {
        self.session_id = Some(session_id);
        self
    }

    fn write_dhcp(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- DHCP events ---")?;
        writeln!(
            f,
            "{:<6} {:<28} {:<18} {:<18} {:<10} {:<6}",
            "No", "Time", "Source", "Destination", "Type", "Bytes"
        )?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        for e in &self.result.dhcp_events {
            writeln!(
                f,
                "{:<6} {:<28} {:<18} {:<18} {:<10} {:<6}",
                e.sequence_number,
                format_timestamp(&e.timestamp),
                e.source_address.to_string(),
                e.dest_address.to_string(),
                e.message_type.as_str(),
                e.byte_length
            )?;
        }

        writeln!(f, "\nDHCP parameters:")?;
        for e in &self.result.dhcp_events {
            write!(
                f,
                "  Packet #{} ({}): TxID={}, MAC={}",
                e.sequence_number, e.message_type, e.transaction_id, e.client_mac
            )?;
            if let Some(ip) = e.offered_ip {
                write!(f, ", IP={}", ip)?;
            }
            if let Some(ip) = e.requested_ip {
                write!(f, ", Requested={}", ip)?;
            }
            if let Some(server) = e.server_id {
                write!(f, ", Server={}", server)?;
            }
            if let Some(mask) = e.subnet_mask {
                write!(f, ", Mask={}", mask)?;
            }
            if let Some(lease) = e.lease_seconds {
                write!(f, ", Lease={}s", lease)?;
            }
            writeln!(f)?;
        }

        let transactions = self.result.transactions(self.keying);
        writeln!(
            f,
            "\nDHCP transactions: {} ({} complete)",
            transactions.len(),
            transactions.complete_count()
        )?;
        for transaction in transactions.iter() {
            let sequence: Vec<&str> = transaction.events.iter().map(|e| e.message_type.as_str()).collect();
            let state = if transaction.is_complete() { "complete" } else { "partial" };
            write!(f, "  {}: {} [{}]", transaction.key, sequence.join(" -> "), state)?;
            if let Some(ip) = transaction.assigned_address() {
                write!(f, ", assigned {}", ip)?;
            }
            if let Some(lease) = transaction.lease_seconds() {
                write!(f, " for {}s", lease)?;
            }
            if transaction.events.len() > 1 {
                write!(f, " ({} ms)", transaction.duration().num_milliseconds())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn write_dns(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n--- DNS activity ---")?;
        writeln!(
            f,
            "Queries: {}, Responses: {}",
            self.result.dns_queries.len(),
            self.result.dns_responses.len()
        )?;

        writeln!(f, "\nDNS queries:")?;
        writeln!(
            f,
            "{:<6} {:<28} {:<18} {:<18} {}",
            "No", "Time", "Client", "DNS server", "Domain"
        )?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH + 10))?;
        for q in &self.result.dns_queries {
            writeln!(
                f,
                "{:<6} {:<28} {:<18} {:<18} {}",
                q.sequence_number,
                format_timestamp(&q.timestamp),
                q.source_address.to_string(),
                q.dest_address.to_string(),
                q.query_name.as_deref().unwrap_or("-")
            )?;
        }

        writeln!(f, "\nDNS answers:")?;
        for answer in self.result.answers() {
            writeln!(
                f,
                "  {} -> {}",
                answer.query_name.unwrap_or("-"),
                answer.resolution
            )?;
        }

        let unanswered = self.result.unanswered_queries();
        if !unanswered.is_empty() {
            writeln!(f, "\nQueries without a response:")?;
            for q in unanswered {
                writeln!(f, "  #{} {}", q.sequence_number, q.query_name.as_deref().unwrap_or("-"))?;
            }
        }
        Ok(())
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n--- IP addresses ({}) ---", self.result.all_addresses.len())?;
        for ip in &self.result.all_addresses {
            writeln!(f, "  {}", ip)?;
        }

        writeln!(f, "\n--- MAC addresses ({}) ---", self.result.all_mac_addresses.len())?;
        for mac in &self.result.all_mac_addresses {
            writeln!(f, "  {}", mac)?;
        }

        writeln!(f, "\n--- Unique queried domains ({}) ---", self.result.unique_domains.len())?;
        for domain in &self.result.unique_domains {
            writeln!(f, "  {}", domain)?;
        }

        let stats = self.statistics;
        writeln!(f, "\n--- Statistics ---")?;
        for (message_type, count) in &stats.message_type_frequency {
            writeln!(f, "  DHCP {:<10} {}", message_type.as_str(), count)?;
        }
        for (query_type, count) in &stats.query_type_frequency {
            writeln!(f, "  DNS type {:<6} {}", query_type, count)?;
        }
        for (domain, count) in stats.top_domains() {
            writeln!(f, "  {:<40} {}", domain, count)?;
        }
        if let Some(sizes) = &stats.dhcp_sizes {
            writeln!(
                f,
                "  DHCP sizes: min {} / median {:.1} / max {} bytes",
                sizes.min, sizes.median, sizes.max
            )?;
        }
        if let Some(sizes) = &stats.dns_sizes {
            writeln!(
                f,
                "  DNS sizes: min {} / median {:.1} / max {} bytes",
                sizes.min, sizes.median, sizes.max
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== DHCP / DNS CAPTURE ANALYSIS ===")?;
        if let Some(session_id) = self.session_id {
            writeln!(f, "Session ID: {}", session_id)?;
        }
        writeln!(f)?;

        self.write_dhcp(f)?;
        self.write_dns(f)?;
        self.write_summary(f)?;

        if !self.diagnostics.is_empty() {
            writeln!(f, "\n--- Diagnostics ({}) ---", self.diagnostics.len())?;
            for diagnostic in self.diagnostics {
                writeln!(f, "  {}", diagnostic)?;
            }
        }
        Ok(())
    }
}
