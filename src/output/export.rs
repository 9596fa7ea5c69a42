use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use log::info;
use serde::Serialize;
use crate::capture::Protocol;
use crate::engine::{DhcpEvent, DnsEvent, EngineResult};
use crate::utils::format_timestamp;
use crate::Result;
use super::timeline::Timeline;

/// One event in the structured export, tagged with its protocol.
#[derive(Debug, Serialize)]
#[serde(tag = "protocol")]
pub enum EventRecord<'a> {
    #[serde(rename = "DHCP")]
    Dhcp(&'a DhcpEvent),
    #[serde(rename = "DNS")]
    Dns(&'a DnsEvent),
}

/// DHCP events, then queries, then responses.
pub fn event_records(result: &EngineResult) -> impl Iterator<Item = EventRecord<'_>> {
    result
        .dhcp_events
        .iter()
        .map(EventRecord::Dhcp)
        .chain(result.dns_events().map(EventRecord::Dns))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableRow {
    pub protocol: Protocol,
    pub sequence_number: u64,
    pub timestamp: String,
    pub source: String,
    pub destination: String,
    pub subtype: String,
    pub details: String,
}

pub fn table_rows(result: &EngineResult) -> Vec<TableRow> {
    let dhcp = result.dhcp_events.iter().map(|e| TableRow {
        protocol: Protocol::Dhcp,
        sequence_number: e.sequence_number,
        timestamp: format_timestamp(&e.timestamp),
        source: e.source_address.to_string(),
        destination: e.dest_address.to_string(),
        subtype: e.message_type.to_string(),
        details: format!("TxID={}", e.transaction_id),
    });

    let dns = result.dns_events().map(|e| {
        let name = e.query_name.as_deref().unwrap_or("-");
        let details = if e.is_response() {
            match e.resolved_address {
                Some(ip) => format!("{} -> {}", name, ip),
                None => format!("{} -> NXDOMAIN", name),
            }
        } else {
            name.to_string()
        };

        TableRow {
            protocol: Protocol::Dns,
            sequence_number: e.sequence_number,
            timestamp: format_timestamp(&e.timestamp),
            source: e.source_address.to_string(),
            destination: e.dest_address.to_string(),
            subtype: e.kind.to_string(),
            details,
        }
    });

    dhcp.chain(dns).collect()
}

pub fn write_events_csv_to<W: Write>(writer: W, result: &EngineResult) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    for row in table_rows(result) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_events_ndjson_to<W: Write>(mut writer: W, result: &EngineResult) -> Result<()> {
    for record in event_records(result) {
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_artifacts_json<P: AsRef<Path>>(path: P, result: &EngineResult) -> Result<()> {
    let writer = create(path.as_ref())?;
    serde_json::to_writer_pretty(writer, result)?;
    info!("Artifacts saved to {}", path.as_ref().display());
    Ok(())
}

pub fn write_events_ndjson<P: AsRef<Path>>(path: P, result: &EngineResult) -> Result<()> {
    write_events_ndjson_to(create(path.as_ref())?, result)?;
    info!("Event records saved to {}", path.as_ref().display());
    Ok(())
}

pub fn write_events_csv<P: AsRef<Path>>(path: P, result: &EngineResult) -> Result<()> {
    write_events_csv_to(create(path.as_ref())?, result)?;
    info!("Event table saved to {}", path.as_ref().display());
    Ok(())
}

pub fn write_timeline_json<P: AsRef<Path>>(path: P, timeline: &Timeline) -> Result<()> {
    let writer = create(path.as_ref())?;
    serde_json::to_writer_pretty(writer, timeline)?;
    info!("Timeline data saved to {}", path.as_ref().display());
    Ok(())
}

pub fn write_report<P: AsRef<Path>>(path: P, report: &str) -> Result<()> {
    let mut writer = create(path.as_ref())?;
    writer.write_all(report.as_bytes())?;
    writer.flush()?;
    info!("Report saved to {}", path.as_ref().display());
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}
