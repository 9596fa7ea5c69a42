pub mod event;
pub mod extract;
pub mod dhcp;
pub mod dns;
pub mod aggregate;
pub mod facade;

#[cfg(test)]
pub(crate) mod fixtures;

pub use event::{DhcpEvent, DhcpMessageType, DnsEvent, DnsKind, TransactionId};
pub use extract::{extract_dhcp, extract_dns, Extracted};
pub use dhcp::{classify, DhcpTransactions, Transaction, TransactionKey, TransactionKeying};
pub use dns::{resolutions_for, Answer, Resolution};
pub use aggregate::{aggregate, Aggregate, SizeSummary, Statistics};
pub use facade::{Engine, EngineResult, RunOutcome};
