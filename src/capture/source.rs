use std::fmt;
use std::path::Path;
use log::{debug, info};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use crate::{ArtifactError, Result};
use super::record::FieldRecord;

/// Loads packet records from a JSON export of a capture.
///
/// The file may hold a JSON array of records or one record per line.
/// Records can be flat (`{"frame.number": "1", ...}`) or nested dissector
/// trees (`{"_source": {"layers": {"frame": {...}}}}`); both are flattened
/// with [`flatten_record`].
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<FieldRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let records = parse_records(&content)?;

    info!("Loaded {} packet records from {}", records.len(), path.display());
    Ok(records)
}

pub fn parse_records(content: &str) -> Result<Vec<FieldRecord>> {
    let trimmed = content.trim_start();

    if trimmed.starts_with('[') {
        let nodes: Vec<DissectorNode> = serde_json::from_str(trimmed)?;
        return nodes
            .iter()
            .enumerate()
            .map(|(index, node)| record_from_node(node, index + 1))
            .collect();
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let node: DissectorNode = serde_json::from_str(line)?;
            record_from_node(&node, index + 1)
        })
        .collect()
}

fn record_from_node(node: &DissectorNode, ordinal: usize) -> Result<FieldRecord> {
    if !matches!(node, DissectorNode::Object(_)) {
        return Err(ArtifactError::Parse(format!(
            "Capture entry {} is not a JSON object",
            ordinal
        )));
    }

    let record = flatten_record(node);
    debug!("Capture entry {} flattened to {} fields", ordinal, record.len());
    Ok(record)
}

/// JSON value that keeps object members in document order, duplicates
/// included.
///
/// Dissector exports repeat keys such as `dhcp.option.type_tree` once per
/// option, which a map-backed value would collapse to the last member.
#[derive(Debug, Clone, PartialEq)]
pub enum DissectorNode {
    Null,
    Scalar(String),
    Array(Vec<DissectorNode>),
    Object(Vec<(String, DissectorNode)>),
}

impl<'de> Deserialize<'de> for DissectorNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = DissectorNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Scalar(if v { "1" } else { "0" }.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Scalar(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Scalar(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(DissectorNode::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(DissectorNode::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(member) = map.next_entry::<String, DissectorNode>()? {
            members.push(member);
        }
        Ok(DissectorNode::Object(members))
    }
}

/// Walks the tree in document order and keeps the first scalar seen for
/// each key. Objects nested in arrays are walked like any other subtree.
pub fn flatten_record(node: &DissectorNode) -> FieldRecord {
    let mut record = FieldRecord::new();
    flatten_into(node, &mut record);
    record
}

fn flatten_into(node: &DissectorNode, record: &mut FieldRecord) {
    let DissectorNode::Object(members) = node else {
        return;
    };

    for (key, member) in members {
        flatten_member(key, member, record);
    }
}

fn flatten_member(key: &str, member: &DissectorNode, record: &mut FieldRecord) {
    match member {
        DissectorNode::Null => {}
        DissectorNode::Scalar(text) => record.insert_first(key, text.clone()),
        DissectorNode::Object(_) => flatten_into(member, record),
        DissectorNode::Array(items) => {
            for item in items {
                flatten_member(key, item, record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::record::{fields, PacketRecord};
    use crate::engine::{extract_dhcp, extract_dns, DhcpMessageType};

    #[test]
    fn test_parse_flat_array() {
        let content = r#"[
            {"frame.number": "1", "frame.len": 342, "dhcp.id": "0x0000aaaa"},
            {"frame.number": "2", "frame.len": 590}
        ]"#;

        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field(fields::FRAME_LEN), Some("342"));
        assert_eq!(records[0].field(fields::DHCP_TRANSACTION_ID), Some("0x0000aaaa"));
        assert!(!records[1].has_field(fields::DHCP_TRANSACTION_ID));
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let content = "{\"frame.number\": \"1\"}\n\n{\"frame.number\": \"2\"}\n";
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].field(fields::FRAME_NUMBER), Some("2"));
    }

    #[test]
    fn test_flatten_dissector_tree() {
        let content = r#"[{
            "_index": "packets",
            "_source": {
                "layers": {
                    "frame": {"frame.number": "5", "frame.time_epoch": "1700000000.250000000"},
                    "ip": {"ip.src": "10.0.0.2", "ip.dst": "8.8.8.8"},
                    "dns": {
                        "dns.flags_tree": {"dns.flags.response": "1"},
                        "Queries": {"example.com: type A, class IN": {"dns.qry.name": "example.com", "dns.qry.type": "1"}},
                        "Answers": {"example.com: type A, class IN, addr 93.184.216.34": {"dns.a": ["93.184.216.34", "93.184.216.35"]}}
                    }
                }
            }
        }]"#;

        let records = parse_records(content).unwrap();
        let record = &records[0];
        assert_eq!(record.field(fields::FRAME_NUMBER), Some("5"));
        assert_eq!(record.field(fields::DNS_RESPONSE_FLAG), Some("1"));
        assert_eq!(record.field(fields::DNS_QUERY_NAME), Some("example.com"));
        assert_eq!(record.field(fields::DNS_A), Some("93.184.216.34"));
    }

    const DHCP_ACK_TREE: &str = r#"{
        "_source": {
            "layers": {
                "frame": {"frame.number": "4", "frame.time_epoch": "1700000000.004000000", "frame.len": "342"},
                "eth": {"eth.dst": "00:0c:29:aa:bb:01", "eth.src": "00:50:56:c0:00:08"},
                "ip": {"ip.src": "192.168.1.1", "ip.dst": "10.0.0.5"},
                "dhcp": {
                    "dhcp.type": "2",
                    "dhcp.id": "0x000000aa",
                    "dhcp.ip.your": "10.0.0.5",
                    "dhcp.hw.mac_addr": "00:0c:29:aa:bb:01",
                    "dhcp.option.type": "53",
                    "dhcp.option.type_tree": {"dhcp.option.length": "1", "dhcp.option.dhcp": "5"},
                    "dhcp.option.type": "54",
                    "dhcp.option.type_tree": {"dhcp.option.length": "4", "dhcp.option.dhcp_server_id": "192.168.1.1"},
                    "dhcp.option.type": "51",
                    "dhcp.option.type_tree": {"dhcp.option.length": "4", "dhcp.option.ip_address_lease_time": "3600"},
                    "dhcp.option.type": "1",
                    "dhcp.option.type_tree": {"dhcp.option.length": "4", "dhcp.option.subnet_mask": "255.255.255.0"},
                    "dhcp.option.type": "255",
                    "dhcp.option.type_tree": {"dhcp.option.end": "255"}
                }
            }
        }
    }"#;

    fn assert_ack_options(record: &FieldRecord) {
        assert_eq!(record.field(fields::DHCP_MESSAGE_TYPE), Some("5"));

        let extracted = extract_dhcp(record).unwrap();
        assert!(extracted.warnings.is_empty());
        let event = extracted.event;
        assert_eq!(event.message_type, DhcpMessageType::Ack);
        assert_eq!(event.lease_seconds, Some(3600));
        assert_eq!(event.server_id, Some("192.168.1.1".parse().unwrap()));
        assert_eq!(event.subnet_mask, Some("255.255.255.0".parse().unwrap()));
        assert_eq!(event.offered_ip, Some("10.0.0.5".parse().unwrap()));
    }

    #[test]
    fn test_repeated_option_trees_all_kept() {
        let records = parse_records(&format!("[{}]", DHCP_ACK_TREE)).unwrap();
        let record = &records[0];
        assert_eq!(record.field("dhcp.option.type"), Some("53"));
        assert_ack_options(record);
    }

    #[test]
    fn test_option_trees_as_array() {
        let content = r#"[{
            "_source": {
                "layers": {
                    "frame": {"frame.number": "4", "frame.time_epoch": "1700000000.004000000", "frame.len": "342"},
                    "eth": {"eth.dst": "00:0c:29:aa:bb:01", "eth.src": "00:50:56:c0:00:08"},
                    "ip": {"ip.src": "192.168.1.1", "ip.dst": "10.0.0.5"},
                    "dhcp": {
                        "dhcp.id": "0x000000aa",
                        "dhcp.ip.your": "10.0.0.5",
                        "dhcp.hw.mac_addr": "00:0c:29:aa:bb:01",
                        "dhcp.option.type": ["53", "54", "51", "1", "255"],
                        "dhcp.option.type_tree": [
                            {"dhcp.option.length": "1", "dhcp.option.dhcp": "5"},
                            {"dhcp.option.length": "4", "dhcp.option.dhcp_server_id": "192.168.1.1"},
                            {"dhcp.option.length": "4", "dhcp.option.ip_address_lease_time": "3600"},
                            {"dhcp.option.length": "4", "dhcp.option.subnet_mask": "255.255.255.0"},
                            {"dhcp.option.end": "255"}
                        ]
                    }
                }
            }
        }]"#;

        let records = parse_records(content).unwrap();
        assert_ack_options(&records[0]);
    }

    #[test]
    fn test_ndjson_dissector_tree() {
        let content = DHCP_ACK_TREE.replace('\n', " ");
        let records = parse_records(&content).unwrap();
        assert_eq!(records.len(), 1);
        assert_ack_options(&records[0]);
    }

    #[test]
    fn test_first_answer_in_document_order() {
        let content = r#"[{
            "_source": {
                "layers": {
                    "frame": {"frame.number": "12", "frame.time_epoch": "1700000000.012000000", "frame.len": "106"},
                    "ip": {"ip.src": "8.8.8.8", "ip.dst": "10.0.0.5"},
                    "dns": {
                        "dns.flags_tree": {"dns.flags.response": "1"},
                        "Queries": {"b.example: type A, class IN": {"dns.qry.name": "b.example", "dns.qry.type": "1"}},
                        "Answers": {
                            "b.example: type A, class IN, addr 9.0.0.1": {"dns.a": "9.0.0.1"},
                            "b.example: type A, class IN, addr 10.0.0.9": {"dns.a": "10.0.0.9"}
                        }
                    }
                }
            }
        }]"#;

        let records = parse_records(content).unwrap();
        assert_eq!(records[0].field(fields::DNS_A), Some("9.0.0.1"));

        let event = extract_dns(&records[0]).unwrap().event;
        assert_eq!(event.resolved_address, Some("9.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_nulls_skipped() {
        let records = parse_records(r#"[{"dns.a": null, "Answers": {"x": {"dns.a": "1.2.3.4"}}}]"#).unwrap();
        assert_eq!(records[0].field(fields::DNS_A), Some("1.2.3.4"));
    }

    #[test]
    fn test_booleans_normalized() {
        let records = parse_records(r#"[{"dns.flags.response": true}]"#).unwrap();
        assert_eq!(records[0].field(fields::DNS_RESPONSE_FLAG), Some("1"));
    }

    #[test]
    fn test_non_object_entry_rejected() {
        let err = parse_records("[1, 2]").unwrap_err();
        assert!(matches!(err, ArtifactError::Parse(_)));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(parse_records("{not json"), Err(ArtifactError::Json(_))));
    }
}
