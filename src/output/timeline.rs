use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::capture::Protocol;
use crate::engine::{EngineResult, SizeSummary, Statistics};
use crate::utils::{offset_millis, offset_seconds, short_domain_label};

/// One plotted event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub protocol: Protocol,
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    /// Offset from the first event of the same protocol. Milliseconds for
    /// DHCP, seconds for DNS.
    pub offset: f64,
    /// Message type for DHCP, query/response for DNS.
    pub category: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainBar {
    pub label: String,
    pub domain: String,
    pub count: usize,
}

/// Chart-ready series for an external plotting tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub dhcp: Vec<TimelinePoint>,
    pub dns: Vec<TimelinePoint>,
    pub domain_bars: Vec<DomainBar>,
    pub dhcp_sizes: Option<SizeSummary>,
    pub dns_sizes: Option<SizeSummary>,
}

impl Timeline {
    pub fn from_result(result: &EngineResult, statistics: &Statistics) -> Self {
        let dhcp = match result.dhcp_events.first() {
            Some(first) => result
                .dhcp_events
                .iter()
                .map(|e| TimelinePoint {
                    protocol: Protocol::Dhcp,
                    sequence_number: e.sequence_number,
                    timestamp: e.timestamp,
                    offset: offset_millis(&first.timestamp, &e.timestamp),
                    category: e.message_type.to_string(),
                    label: format!("#{} {}", e.sequence_number, e.message_type),
                })
                .collect(),
            None => Vec::new(),
        };

        let mut dns_events: Vec<_> = result.dns_events().collect();
        dns_events.sort_by_key(|e| e.sequence_number);
        let dns = match dns_events.first() {
            Some(first) => dns_events
                .iter()
                .map(|e| TimelinePoint {
                    protocol: Protocol::Dns,
                    sequence_number: e.sequence_number,
                    timestamp: e.timestamp,
                    offset: offset_seconds(&first.timestamp, &e.timestamp),
                    category: e.kind.to_string(),
                    label: format!("#{} {}", e.sequence_number, e.kind),
                })
                .collect(),
            None => Vec::new(),
        };

        let domain_bars = statistics
            .top_domains()
            .into_iter()
            .map(|(domain, count)| DomainBar {
                label: short_domain_label(domain),
                domain: domain.to_string(),
                count,
            })
            .collect();

        Self {
            dhcp,
            dns,
            domain_bars,
            dhcp_sizes: statistics.dhcp_sizes.clone(),
            dns_sizes: statistics.dns_sizes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::engine::fixtures::{self, CLIENT_MAC};
    use crate::engine::Engine;

    fn result() -> EngineResult {
        let dns = vec![
            fixtures::dns_query(10, "a.b.example.com"),
            fixtures::dns_response(12, "a.b.example.com", Some("1.2.3.4")),
            fixtures::dns_query(11, "example.com"),
        ];
        Engine::new(&AnalysisConfig::default())
            .run(fixtures::dora("0xAA", CLIENT_MAC, 1), dns)
            .unwrap()
            .result
    }

    #[test]
    fn test_dhcp_points_in_milliseconds() {
        let result = result();
        let timeline = Timeline::from_result(&result, &result.statistics());

        let offsets: Vec<f64> = timeline.dhcp.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(timeline.dhcp[0].label, "#1 Discover");
        assert_eq!(timeline.dhcp[3].category, "ACK");
    }

    #[test]
    fn test_dns_points_merged_by_sequence() {
        let result = result();
        let timeline = Timeline::from_result(&result, &result.statistics());

        let seqs: Vec<u64> = timeline.dns.iter().map(|p| p.sequence_number).collect();
        assert_eq!(seqs, vec![10, 11, 12]);
        assert_eq!(timeline.dns[2].category, "Response");
        assert!((timeline.dns[2].offset - 0.002).abs() < 1e-9);
    }

    #[test]
    fn test_domain_bars_use_short_labels() {
        let result = result();
        let timeline = Timeline::from_result(&result, &result.statistics());

        let labels: Vec<&str> = timeline.domain_bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["a.b...", "example.com"]);
        assert!(timeline.dhcp_sizes.is_some());
    }
}
