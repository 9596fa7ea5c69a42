//! Record builders shared by the engine tests.

use crate::capture::{fields, FieldRecord};

pub const CLIENT_MAC: &str = "00:0c:29:aa:bb:01";
pub const SERVER_MAC: &str = "00:50:56:c0:00:08";
pub const BROADCAST_MAC: &str = "ff:ff:ff:ff:ff:ff";

fn frame(seq: u64, len: u32) -> FieldRecord {
    let mut record = FieldRecord::new();
    record.insert(fields::FRAME_NUMBER, seq.to_string());
    record.insert(fields::FRAME_TIME_EPOCH, format!("1700000000.{:03}000000", seq));
    record.insert(fields::FRAME_LEN, len.to_string());
    record
}

/// A DHCP record with every mandatory field and no options.
pub fn dhcp(seq: u64, code: &str, xid: &str, client_mac: &str) -> FieldRecord {
    let mut record = frame(seq, 342);
    let from_client = matches!(code, "1" | "3" | "4" | "7" | "8");
    let (src_ip, dst_ip, src_mac, dst_mac) = if from_client {
        ("0.0.0.0", "255.255.255.255", client_mac, BROADCAST_MAC)
    } else {
        ("192.168.1.1", "255.255.255.255", SERVER_MAC, BROADCAST_MAC)
    };
    record.insert(fields::IP_SRC, src_ip);
    record.insert(fields::IP_DST, dst_ip);
    record.insert(fields::ETH_SRC, src_mac);
    record.insert(fields::ETH_DST, dst_mac);
    record.insert(fields::DHCP_MESSAGE_TYPE, code);
    record.insert(fields::DHCP_TRANSACTION_ID, xid);
    record.insert(fields::DHCP_CLIENT_MAC, client_mac);
    record.insert(fields::DHCP_YOUR_IP, "0.0.0.0");
    record
}

pub fn with(mut record: FieldRecord, name: &str, value: &str) -> FieldRecord {
    record.insert(name, value);
    record
}

pub fn without(mut record: FieldRecord, name: &str) -> FieldRecord {
    record.remove(name);
    record
}

/// Discover, Offer, Request, Ack for one client.
pub fn dora(xid: &str, client_mac: &str, first_seq: u64) -> Vec<FieldRecord> {
    vec![
        dhcp(first_seq, "1", xid, client_mac),
        with(dhcp(first_seq + 1, "2", xid, client_mac), fields::DHCP_YOUR_IP, "10.0.0.5"),
        with(dhcp(first_seq + 2, "3", xid, client_mac), fields::DHCP_REQUESTED_IP, "10.0.0.5"),
        with(
            with(dhcp(first_seq + 3, "5", xid, client_mac), fields::DHCP_LEASE_TIME, "3600"),
            fields::DHCP_SERVER_ID,
            "192.168.1.1",
        ),
    ]
}

fn dns(seq: u64, flag: &str, name: &str, len: u32) -> FieldRecord {
    let mut record = frame(seq, len);
    let (src, dst) = if flag == "0" {
        ("10.0.0.5", "8.8.8.8")
    } else {
        ("8.8.8.8", "10.0.0.5")
    };
    record.insert(fields::IP_SRC, src);
    record.insert(fields::IP_DST, dst);
    record.insert(fields::DNS_RESPONSE_FLAG, flag);
    record.insert(fields::DNS_QUERY_NAME, name);
    record.insert(fields::DNS_QUERY_TYPE, "1");
    record
}

pub fn dns_query(seq: u64, name: &str) -> FieldRecord {
    dns(seq, "0", name, 74)
}

pub fn dns_response(seq: u64, name: &str, address: Option<&str>) -> FieldRecord {
    let record = dns(seq, "1", name, 90);
    match address {
        Some(address) => with(record, fields::DNS_A, address),
        None => record,
    }
}
