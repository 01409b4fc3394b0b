use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::framing::write_frame;
use crate::error::DatasetError;

/// File name of shard `index` out of `num_shards`.
pub fn shard_file_name(prefix: &str, index: usize, num_shards: usize) -> String {
    format!("{prefix}-{index:05}-of-{num_shards:05}")
}

/// Paths of every shard a writer with these settings produces, in order.
pub fn shard_paths(output_dir: &Path, prefix: &str, num_shards: usize) -> Vec<PathBuf> {
    (0..num_shards)
        .map(|index| output_dir.join(shard_file_name(prefix, index, num_shards)))
        .collect()
}

/// Distributes framed records round-robin over a fixed set of shard files.
///
/// Record `i` always goes to shard `i % num_shards`. Files are opened up
/// front and released by [`close`](Self::close) or on drop. Writes are not
/// transactional: after a failure the records already written stay readable.
pub struct ShardedRecordWriter {
    shards: Vec<BufWriter<File>>,
    paths: Vec<PathBuf>,
    counts: Vec<usize>,
    closed: bool,
}

impl ShardedRecordWriter {
    /// Creates `output_dir` if needed and opens every shard file.
    pub fn new(output_dir: &Path, prefix: &str, num_shards: usize) -> Result<Self, DatasetError> {
        if num_shards == 0 {
            return Err(DatasetError::InvalidShardCount(num_shards));
        }
        fs::create_dir_all(output_dir).map_err(DatasetError::Io)?;

        let paths = shard_paths(output_dir, prefix, num_shards);
        let mut shards = Vec::with_capacity(num_shards);
        for path in &paths {
            let file = File::create(path).map_err(DatasetError::Io)?;
            shards.push(BufWriter::new(file));
        }
        log::debug!(
            "opened {num_shards} shard(s) with prefix '{prefix}' in {}",
            output_dir.display()
        );

        Ok(Self {
            shards,
            paths,
            counts: vec![0; num_shards],
            closed: false,
        })
    }

    /// Appends `payload` to shard `sequence_index % num_shards`.
    pub fn write(&mut self, sequence_index: usize, payload: &[u8]) -> Result<(), DatasetError> {
        if self.closed {
            return Err(DatasetError::WriterClosed);
        }
        let shard = sequence_index % self.paths.len();
        write_frame(&mut self.shards[shard], payload).map_err(DatasetError::Io)?;
        self.counts[shard] += 1;
        Ok(())
    }

    /// Flushes and closes every shard. Calling it again is a no-op.
    ///
    /// All shards are released even if one fails to flush; the first error
    /// is returned.
    pub fn close(&mut self) -> Result<(), DatasetError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut first_error = None;
        for (mut shard, path) in self.shards.drain(..).zip(&self.paths) {
            if let Err(err) = shard.flush() {
                log::warn!("failed to flush shard {}: {err}", path.display());
                if first_error.is_none() {
                    first_error = Some(DatasetError::Io(err));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn num_shards(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Records written so far, per shard.
    pub fn record_counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ShardedRecordWriter {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("error while closing record shards: {err}");
        }
    }
}
