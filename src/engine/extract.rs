//! Per-packet field extraction.
//!
//! Raw dissector text is normalized into typed events here and nowhere
//! else. Missing mandatory fields reject the record; optional fields that
//! are present but cannot be decoded are dropped with a warning.

use std::net::IpAddr;
use std::str::FromStr;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use crate::capture::{fields, MacAddress, PacketRecord};
use crate::error::RecordError;
use super::event::{DhcpEvent, DhcpMessageType, DnsEvent, DnsKind, TransactionId};

type RecordResult<T> = std::result::Result<T, RecordError>;

/// An extracted event plus the non-fatal issues found while decoding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<E> {
    pub event: E,
    pub warnings: Vec<RecordError>,
}

const NAIVE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%b %d, %Y %H:%M:%S%.f",
];

pub fn extract_dhcp<R: PacketRecord + ?Sized>(record: &R) -> RecordResult<Extracted<DhcpEvent>> {
    let mut warnings = Vec::new();

    let sequence_number = sequence_number(record)?;
    let timestamp = timestamp(record)?;
    let byte_length = required_parse(record, fields::FRAME_LEN)?;
    let source_address = network_address(record, fields::IP_SRC, fields::IPV6_SRC)?;
    let dest_address = network_address(record, fields::IP_DST, fields::IPV6_DST)?;
    let source_mac = required_parse::<_, MacAddress>(record, fields::ETH_SRC)?;
    let dest_mac = required_parse::<_, MacAddress>(record, fields::ETH_DST)?;
    let transaction_id = TransactionId::new(required(record, fields::DHCP_TRANSACTION_ID)?);
    let client_mac = required_parse::<_, MacAddress>(record, fields::DHCP_CLIENT_MAC)?;

    let message_type = message_type(record, &mut warnings);
    let requested_ip = optional_parse(record, fields::DHCP_REQUESTED_IP, &mut warnings);
    let server_id = optional_parse(record, fields::DHCP_SERVER_ID, &mut warnings);
    let subnet_mask = optional_parse(record, fields::DHCP_SUBNET_MASK, &mut warnings);
    let lease_seconds = optional_parse(record, fields::DHCP_LEASE_TIME, &mut warnings);
    // 0.0.0.0 in yiaddr means nothing has been offered yet.
    let offered_ip = optional_parse::<_, IpAddr>(record, fields::DHCP_YOUR_IP, &mut warnings)
        .filter(|ip| !ip.is_unspecified());

    Ok(Extracted {
        event: DhcpEvent {
            sequence_number,
            timestamp,
            source_address,
            dest_address,
            source_mac,
            dest_mac,
            byte_length,
            message_type,
            transaction_id,
            client_mac,
            requested_ip,
            server_id,
            subnet_mask,
            lease_seconds,
            offered_ip,
        },
        warnings,
    })
}

pub fn extract_dns<R: PacketRecord + ?Sized>(record: &R) -> RecordResult<Extracted<DnsEvent>> {
    let mut warnings = Vec::new();

    let sequence_number = sequence_number(record)?;
    let timestamp = timestamp(record)?;
    let byte_length = required_parse(record, fields::FRAME_LEN)?;
    let source_address = network_address(record, fields::IP_SRC, fields::IPV6_SRC)?;
    let dest_address = network_address(record, fields::IP_DST, fields::IPV6_DST)?;
    let kind = if is_response_flag(required(record, fields::DNS_RESPONSE_FLAG)?) {
        DnsKind::Response
    } else {
        DnsKind::Query
    };

    let query_name = record.field(fields::DNS_QUERY_NAME).map(str::to_string);
    let query_type = record.field(fields::DNS_QUERY_TYPE).map(|t| t.trim().to_string());

    let resolved_address = match kind {
        DnsKind::Response => optional_parse::<_, IpAddr>(record, fields::DNS_A, &mut warnings)
            .or_else(|| optional_parse(record, fields::DNS_AAAA, &mut warnings)),
        DnsKind::Query => None,
    };

    Ok(Extracted {
        event: DnsEvent {
            sequence_number,
            timestamp,
            source_address,
            dest_address,
            byte_length,
            kind,
            query_name,
            query_type,
            resolved_address,
        },
        warnings,
    })
}

/// Response flag normalization: `1` and `True` (any case) mean response,
/// every other value means query.
pub fn is_response_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Best-effort frame number, used to label diagnostics for rejected records.
pub fn sequence_hint<R: PacketRecord + ?Sized>(record: &R) -> Option<u64> {
    record.field(fields::FRAME_NUMBER)?.trim().parse().ok()
}

fn sequence_number<R: PacketRecord + ?Sized>(record: &R) -> RecordResult<u64> {
    required_parse(record, fields::FRAME_NUMBER)
}

fn message_type<R: PacketRecord + ?Sized>(record: &R, warnings: &mut Vec<RecordError>) -> DhcpMessageType {
    let Some(raw) = record.field(fields::DHCP_MESSAGE_TYPE) else {
        return DhcpMessageType::Unknown;
    };

    match raw.trim().parse::<u8>().ok().and_then(DhcpMessageType::from_code) {
        Some(message_type) => message_type,
        None => {
            unknown_encoding(fields::DHCP_MESSAGE_TYPE, raw, warnings);
            DhcpMessageType::Unknown
        }
    }
}

fn timestamp<R: PacketRecord + ?Sized>(record: &R) -> RecordResult<DateTime<Utc>> {
    if let Some(raw) = record.field(fields::FRAME_TIME_EPOCH) {
        return parse_epoch(raw).ok_or_else(|| RecordError::unparsable(fields::FRAME_TIME_EPOCH, raw));
    }

    let raw = required(record, fields::FRAME_TIME)?;
    parse_capture_time(raw).ok_or_else(|| RecordError::unparsable(fields::FRAME_TIME, raw))
}

/// Parses `seconds[.fraction]` without going through floating point.
pub fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let (negative, magnitude) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (secs, frac) = magnitude.split_once('.').unwrap_or((magnitude, ""));

    if secs.is_empty() || !secs.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = secs.parse().ok()?;
    let mut digits: String = frac.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    let nanos: u32 = digits.parse().ok()?;

    // Nanoseconds always count forward from the whole second below.
    match (negative, nanos) {
        (false, _) => DateTime::from_timestamp(secs, nanos),
        (true, 0) => DateTime::from_timestamp(-secs, 0),
        (true, _) => DateTime::from_timestamp(-secs - 1, 1_000_000_000 - nanos),
    }
}

/// Parses a textual capture time. Zone-less values are taken as UTC.
pub fn parse_capture_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // "Oct 16, 2026 10:00:00.123456789 UTC" style carries a zone name suffix.
    let without_zone = match raw.rsplit_once(' ') {
        Some((head, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => head,
        _ => raw,
    };

    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(without_zone, format).ok())
        .map(|naive| naive.and_utc())
}

fn network_address<R: PacketRecord + ?Sized>(record: &R, v4: &'static str, v6: &'static str) -> RecordResult<IpAddr> {
    let (name, raw) = match record.field(v4) {
        Some(raw) => (v4, raw),
        None => (v6, record.field(v6).ok_or_else(|| RecordError::missing(v4))?),
    };
    raw.trim().parse().map_err(|_| RecordError::unparsable(name, raw))
}

fn required<'r, R: PacketRecord + ?Sized>(record: &'r R, name: &'static str) -> RecordResult<&'r str> {
    record.field(name).ok_or_else(|| RecordError::missing(name))
}

fn required_parse<R: PacketRecord + ?Sized, T: FromStr>(record: &R, name: &'static str) -> RecordResult<T> {
    let raw = required(record, name)?;
    raw.trim().parse().map_err(|_| RecordError::unparsable(name, raw))
}

fn optional_parse<R: PacketRecord + ?Sized, T: FromStr>(
    record: &R,
    name: &'static str,
    warnings: &mut Vec<RecordError>,
) -> Option<T> {
    let raw = record.field(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            unknown_encoding(name, raw, warnings);
            None
        }
    }
}

fn unknown_encoding(name: &'static str, raw: &str, warnings: &mut Vec<RecordError>) {
    warn!("Ignoring field {} with unrecognized encoding {:?}", name, raw);
    warnings.push(RecordError::UnknownFieldEncoding {
        field: name,
        value: raw.to_string(),
    });
}
