pub mod record;
pub mod source;

pub use record::{fields, FieldRecord, MacAddress, PacketRecord, Protocol};
pub use source::{flatten_record, load_records, parse_records};
