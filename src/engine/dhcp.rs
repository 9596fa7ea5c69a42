use std::collections::BTreeMap;
use std::net::IpAddr;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::capture::MacAddress;
use super::event::{DhcpEvent, DhcpMessageType, TransactionId};

/// How DHCP events are keyed into transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKeying {
    /// `(transaction id, client MAC)`, so two clients that happen to pick
    /// the same xid stay apart.
    #[default]
    Compound,
    TransactionId,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TransactionKey {
    pub transaction_id: TransactionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_mac: Option<MacAddress>,
}

impl TransactionKey {
    pub fn for_event(event: &DhcpEvent, keying: TransactionKeying) -> Self {
        Self {
            transaction_id: event.transaction_id.clone(),
            client_mac: match keying {
                TransactionKeying::Compound => Some(event.client_mac),
                TransactionKeying::TransactionId => None,
            },
        }
    }
}

impl std::fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.client_mac {
            Some(mac) => write!(f, "{}/{}", self.transaction_id, mac),
            None => write!(f, "{}", self.transaction_id),
        }
    }
}

/// One DHCP exchange, events ordered by sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction<'a> {
    pub key: &'a TransactionKey,
    pub events: &'a [&'a DhcpEvent],
}

impl<'a> Transaction<'a> {
    pub fn message_types(&self) -> Vec<DhcpMessageType> {
        self.events.iter().map(|e| e.message_type).collect()
    }

    pub fn contains(&self, message_type: DhcpMessageType) -> bool {
        self.events.iter().any(|e| e.message_type == message_type)
    }

    /// A full Discover, Offer, Request, ACK exchange was observed.
    pub fn is_complete(&self) -> bool {
        [
            DhcpMessageType::Discover,
            DhcpMessageType::Offer,
            DhcpMessageType::Request,
            DhcpMessageType::Ack,
        ]
        .iter()
        .all(|t| self.contains(*t))
    }

    /// The address the server committed to: the last ACK's yiaddr, or the
    /// last offer's when no ACK carries one.
    pub fn assigned_address(&self) -> Option<IpAddr> {
        self.last_with(DhcpMessageType::Ack, |e| e.offered_ip)
            .or_else(|| self.last_with(DhcpMessageType::Offer, |e| e.offered_ip))
    }

    pub fn lease_seconds(&self) -> Option<u32> {
        self.last_with(DhcpMessageType::Ack, |e| e.lease_seconds)
    }

    pub fn server_id(&self) -> Option<IpAddr> {
        self.events.iter().find_map(|e| e.server_id)
    }

    pub fn first_seen(&self) -> Option<DateTime<Utc>> {
        self.events.iter().map(|e| e.timestamp).min()
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.events.iter().map(|e| e.timestamp).max()
    }

    pub fn duration(&self) -> Duration {
        match (self.first_seen(), self.last_seen()) {
            (Some(first), Some(last)) => last - first,
            _ => Duration::zero(),
        }
    }

    fn last_with<T>(&self, message_type: DhcpMessageType, get: impl Fn(&DhcpEvent) -> Option<T>) -> Option<T> {
        self.events
            .iter()
            .rev()
            .filter(|e| e.message_type == message_type)
            .find_map(|e| get(e))
    }
}

/// Grouping view over a DHCP event sequence.
///
/// This is a query, not a state machine: partial exchanges and retransmitted
/// messages are grouped as seen.
#[derive(Debug, Clone)]
pub struct DhcpTransactions<'a> {
    groups: BTreeMap<TransactionKey, Vec<&'a DhcpEvent>>,
}

impl<'a> DhcpTransactions<'a> {
    pub fn group(events: &'a [DhcpEvent], keying: TransactionKeying) -> Self {
        let mut groups: BTreeMap<TransactionKey, Vec<&'a DhcpEvent>> = BTreeMap::new();

        for event in events {
            groups
                .entry(TransactionKey::for_event(event, keying))
                .or_default()
                .push(event);
        }

        // Retransmissions may arrive with non-monotonic timestamps; the
        // timeline follows capture sequence.
        for group in groups.values_mut() {
            group.sort_by_key(|e| e.sequence_number);
        }

        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &TransactionKey) -> Option<Transaction<'_>> {
        self.groups
            .get_key_value(key)
            .map(|(key, events)| Transaction { key, events })
    }

    pub fn iter(&self) -> impl Iterator<Item = Transaction<'_>> {
        self.groups
            .iter()
            .map(|(key, events)| Transaction { key, events })
    }

    pub fn complete_count(&self) -> usize {
        self.iter().filter(|t| t.is_complete()).count()
    }
}

/// Buckets events by message type, keeping input order inside each bucket.
pub fn classify<'a>(events: impl IntoIterator<Item = &'a DhcpEvent>) -> BTreeMap<DhcpMessageType, Vec<&'a DhcpEvent>> {
    let mut buckets: BTreeMap<DhcpMessageType, Vec<&'a DhcpEvent>> = BTreeMap::new();
    for event in events {
        buckets.entry(event.message_type).or_default().push(event);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fields;
    use crate::engine::extract::extract_dhcp;
    use crate::engine::fixtures::{self, CLIENT_MAC};

    const OTHER_MAC: &str = "00:0c:29:aa:bb:02";

    fn events(records: &[crate::capture::FieldRecord]) -> Vec<DhcpEvent> {
        records
            .iter()
            .map(|r| extract_dhcp(r).unwrap().event)
            .collect()
    }

    #[test]
    fn test_dora_forms_one_transaction() {
        let events = events(&fixtures::dora("0xAA", CLIENT_MAC, 1));
        let transactions = DhcpTransactions::group(&events, TransactionKeying::Compound);

        assert_eq!(transactions.len(), 1);
        let transaction = transactions.iter().next().unwrap();
        assert_eq!(transaction.events.len(), 4);
        assert_eq!(
            transaction.message_types(),
            vec![
                DhcpMessageType::Discover,
                DhcpMessageType::Offer,
                DhcpMessageType::Request,
                DhcpMessageType::Ack,
            ]
        );
        assert!(transaction.is_complete());
        assert_eq!(transaction.lease_seconds(), Some(3600));
        assert_eq!(transaction.assigned_address(), Some("10.0.0.5".parse().unwrap()));
        assert_eq!(transaction.server_id(), Some("192.168.1.1".parse().unwrap()));
        assert_eq!(transaction.duration(), Duration::milliseconds(3));

        let with_lease: Vec<_> = transaction.events.iter().filter(|e| e.lease_seconds.is_some()).collect();
        assert_eq!(with_lease.len(), 1);
        assert_eq!(with_lease[0].message_type, DhcpMessageType::Ack);

        let with_offer: Vec<_> = transaction.events.iter().filter(|e| e.offered_ip.is_some()).collect();
        assert_eq!(with_offer.len(), 1);
        assert_eq!(with_offer[0].message_type, DhcpMessageType::Offer);
    }

    #[test]
    fn test_shared_xid_different_clients() {
        let mut records = fixtures::dora("0xAA", CLIENT_MAC, 1);
        records.extend(fixtures::dora("0xAA", OTHER_MAC, 10));
        let events = events(&records);

        let compound = DhcpTransactions::group(&events, TransactionKeying::Compound);
        assert_eq!(compound.len(), 2);
        let shared = TransactionId::new("0xaa");
        assert_eq!(compound.iter().filter(|t| t.key.transaction_id == shared).count(), 2);

        let by_xid = DhcpTransactions::group(&events, TransactionKeying::TransactionId);
        assert_eq!(by_xid.len(), 1);
        assert_eq!(by_xid.iter().next().unwrap().events.len(), 8);
    }

    #[test]
    fn test_group_sorted_by_sequence() {
        let mut records = fixtures::dora("0xAA", CLIENT_MAC, 1);
        records.reverse();
        let events = events(&records);
        let transactions = DhcpTransactions::group(&events, TransactionKeying::Compound);

        let seqs: Vec<u64> = transactions
            .iter()
            .flat_map(|t| t.events.iter().map(|e| e.sequence_number))
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_partial_transaction() {
        let events = events(&[fixtures::dhcp(7, "1", "0xBB", CLIENT_MAC)]);
        let transactions = DhcpTransactions::group(&events, TransactionKeying::Compound);

        let key = TransactionKey {
            transaction_id: TransactionId::new("0xBB"),
            client_mac: Some(CLIENT_MAC.parse().unwrap()),
        };
        let transaction = transactions.get(&key).unwrap();
        assert!(!transaction.is_complete());
        assert!(transaction.assigned_address().is_none());
        assert!(transaction.lease_seconds().is_none());
        assert_eq!(transaction.duration(), Duration::zero());
        assert_eq!(transactions.complete_count(), 0);
    }

    #[test]
    fn test_grouping_is_partition() {
        let mut records = fixtures::dora("0xAA", CLIENT_MAC, 1);
        records.extend(fixtures::dora("0xAA", OTHER_MAC, 10));
        records.push(fixtures::dhcp(20, "7", "0xCC", CLIENT_MAC));
        records.push(fixtures::with(fixtures::dhcp(21, "8", "0xDD", OTHER_MAC), fields::DHCP_MESSAGE_TYPE, "42"));
        let events = events(&records);

        let transactions = DhcpTransactions::group(&events, TransactionKeying::Compound);
        let mut regrouped: Vec<DhcpEvent> = transactions
            .iter()
            .flat_map(|t| t.events.iter().map(|e| (*e).clone()))
            .collect();
        regrouped.sort_by_key(|e| e.sequence_number);

        let mut original = events.clone();
        original.sort_by_key(|e| e.sequence_number);
        assert_eq!(regrouped, original);
        assert_eq!(transactions.len(), 4);
    }

    #[test]
    fn test_classify_by_message_type() {
        let mut records = fixtures::dora("0xAA", CLIENT_MAC, 1);
        records.push(fixtures::dhcp(5, "1", "0xBB", OTHER_MAC));
        let events = events(&records);

        let buckets = classify(&events);
        assert_eq!(buckets[&DhcpMessageType::Discover].len(), 2);
        assert_eq!(buckets[&DhcpMessageType::Ack].len(), 1);
        assert!(!buckets.contains_key(&DhcpMessageType::Nak));
    }
}
