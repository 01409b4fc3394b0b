//! Sharded TFRecord export.
//!
//! [`RecordExporter`] turns each record into a `tf.train.Example`,
//! [`ShardedRecordWriter`] frames and distributes the serialized examples,
//! and [`TfRecordReader`] reads them back with checksum verification.

pub mod example;
mod export;
pub mod framing;
mod writer;

pub use example::{Example, Feature};
pub use export::{ExportOptions, ExportSummary, RecordExporter, DEFAULT_SHARD_PREFIX};
pub use framing::{count_records, masked_crc32c, parse_records, TfRecordReader};
pub use writer::{shard_file_name, shard_paths, ShardedRecordWriter};
