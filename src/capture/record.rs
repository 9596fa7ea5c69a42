use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Serializer};
use crate::{ArtifactError, Result};

/// Dissector field names understood by the extractors.
pub mod fields {
    pub const FRAME_NUMBER: &str = "frame.number";
    pub const FRAME_TIME_EPOCH: &str = "frame.time_epoch";
    pub const FRAME_TIME: &str = "frame.time";
    pub const FRAME_LEN: &str = "frame.len";

    pub const ETH_SRC: &str = "eth.src";
    pub const ETH_DST: &str = "eth.dst";

    pub const IP_SRC: &str = "ip.src";
    pub const IP_DST: &str = "ip.dst";
    pub const IPV6_SRC: &str = "ipv6.src";
    pub const IPV6_DST: &str = "ipv6.dst";

    pub const DHCP_MESSAGE_TYPE: &str = "dhcp.option.dhcp";
    pub const DHCP_TRANSACTION_ID: &str = "dhcp.id";
    pub const DHCP_CLIENT_MAC: &str = "dhcp.hw.mac_addr";
    pub const DHCP_YOUR_IP: &str = "dhcp.ip.your";
    pub const DHCP_REQUESTED_IP: &str = "dhcp.option.requested_ip_address";
    pub const DHCP_SERVER_ID: &str = "dhcp.option.dhcp_server_id";
    pub const DHCP_SUBNET_MASK: &str = "dhcp.option.subnet_mask";
    pub const DHCP_LEASE_TIME: &str = "dhcp.option.ip_address_lease_time";

    pub const DNS_RESPONSE_FLAG: &str = "dns.flags.response";
    pub const DNS_QUERY_NAME: &str = "dns.qry.name";
    pub const DNS_QUERY_TYPE: &str = "dns.qry.type";
    pub const DNS_A: &str = "dns.a";
    pub const DNS_AAAA: &str = "dns.aaaa";
}

/// Read access to one decoded packet.
///
/// Every field is optional at this level: `field` reports presence
/// explicitly and the extractors decide which absences are fatal.
pub trait PacketRecord {
    fn field(&self, name: &str) -> Option<&str>;

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

impl<R: PacketRecord + ?Sized> PacketRecord for &R {
    fn field(&self, name: &str) -> Option<&str> {
        (**self).field(name)
    }
}

/// Owned packet record backed by a flat `field name -> text` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    fields: BTreeMap<String, String>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Inserts only if the field is not already set.
    pub fn insert_first(&mut self, name: &str, value: String) {
        self.fields.entry(name.to_string()).or_insert(value);
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PacketRecord for FieldRecord {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = FieldRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Which capture stream a record or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Dhcp,
    Dns,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Dhcp => "DHCP",
            Protocol::Dns => "DNS",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 48-bit link-layer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }
}

impl FromStr for MacAddress {
    type Err = ArtifactError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff`, `aabb.ccdd.eeff`
    /// and bare hex.
    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();

        let bytes = hex::decode(&digits)
            .map_err(|e| ArtifactError::Parse(format!("Invalid MAC address {:?}: {}", s, e)))?;

        let octets: [u8; 6] = bytes
            .try_into()
            .map_err(|_| ArtifactError::Parse(format!("Invalid MAC address length: {:?}", s)))?;

        Ok(MacAddress(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
