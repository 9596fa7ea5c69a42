use std::fmt;
use std::net::IpAddr;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::capture::MacAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DhcpMessageType {
    Discover,
    Offer,
    Request,
    Decline,
    #[serde(rename = "ACK")]
    Ack,
    #[serde(rename = "NAK")]
    Nak,
    Release,
    Inform,
    Unknown,
}

impl DhcpMessageType {
    pub const ALL: [DhcpMessageType; 9] = [
        DhcpMessageType::Discover,
        DhcpMessageType::Offer,
        DhcpMessageType::Request,
        DhcpMessageType::Decline,
        DhcpMessageType::Ack,
        DhcpMessageType::Nak,
        DhcpMessageType::Release,
        DhcpMessageType::Inform,
        DhcpMessageType::Unknown,
    ];

    /// Maps the option 53 code (1-8). Anything else is not a known type.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(DhcpMessageType::Discover),
            2 => Some(DhcpMessageType::Offer),
            3 => Some(DhcpMessageType::Request),
            4 => Some(DhcpMessageType::Decline),
            5 => Some(DhcpMessageType::Ack),
            6 => Some(DhcpMessageType::Nak),
            7 => Some(DhcpMessageType::Release),
            8 => Some(DhcpMessageType::Inform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DhcpMessageType::Discover => "Discover",
            DhcpMessageType::Offer => "Offer",
            DhcpMessageType::Request => "Request",
            DhcpMessageType::Decline => "Decline",
            DhcpMessageType::Ack => "ACK",
            DhcpMessageType::Nak => "NAK",
            DhcpMessageType::Release => "Release",
            DhcpMessageType::Inform => "Inform",
            DhcpMessageType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DhcpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-chosen DHCP transaction token (`xid`).
///
/// Hexadecimal values are normalized to `0x` plus eight lowercase digits so
/// that `0xAA` and `0x000000aa` name the same transaction. Other encodings
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"));

        match digits.and_then(|d| u32::from_str_radix(d, 16).ok()) {
            Some(value) => TransactionId(format!("0x{:08x}", value)),
            None => TransactionId(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpEvent {
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub source_address: IpAddr,
    pub dest_address: IpAddr,
    pub source_mac: MacAddress,
    pub dest_mac: MacAddress,
    pub byte_length: u32,
    pub message_type: DhcpMessageType,
    pub transaction_id: TransactionId,
    pub client_mac: MacAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_mask: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offered_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsKind {
    Query,
    Response,
}

impl DnsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsKind::Query => "Query",
            DnsKind::Response => "Response",
        }
    }
}

impl fmt::Display for DnsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsEvent {
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub source_address: IpAddr,
    pub dest_address: IpAddr,
    pub byte_length: u32,
    pub kind: DnsKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_address: Option<IpAddr>,
}

impl DnsEvent {
    pub fn is_response(&self) -> bool {
        self.kind == DnsKind::Response
    }
}
