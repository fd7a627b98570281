pub mod record;

pub use record::{RawRecord, RawTag, Record, RecordDetails};
