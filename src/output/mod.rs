pub mod export;
pub mod report;
pub mod timeline;

pub use export::{
    write_artifacts_json, write_events_csv, write_events_ndjson, write_report, write_timeline_json,
    EventRecord, TableRow,
};
pub use report::Report;
pub use timeline::Timeline;
