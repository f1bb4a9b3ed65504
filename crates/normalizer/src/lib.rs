pub mod models;
pub mod payloads;
pub mod transform;

pub use models::{ActivityRecord, RecordKind, RecordState};
pub use payloads::{RawRecord, UserRef};
pub use transform::{
    normalize_batch, normalize_record, parse_timestamp, MalformedReason, MalformedRecordError,
    NormalizedBatch,
};
