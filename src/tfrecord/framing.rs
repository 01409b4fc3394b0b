//! TFRecord framing.
//!
//! Each record on disk is:
//!
//! ```text
//! u64 LE    payload length
//! u32 LE    masked crc32c of the 8 length bytes
//! [u8]      payload
//! u32 LE    masked crc32c of the payload
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::DatasetError;

const MASK_DELTA: u32 = 0xa282_ead8;

/// CRC32C of `data`, rotated and offset as TFRecord requires.
pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Writes one framed record.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let length = (payload.len() as u64).to_le_bytes();
    writer.write_all(&length)?;
    writer.write_all(&masked_crc32c(&length).to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&masked_crc32c(payload).to_le_bytes())?;
    Ok(())
}

/// Returns one framed record as bytes.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 16);
    write_frame(&mut bytes, payload).expect("write to vec");
    bytes
}

/// Sequential reader over the records of one TFRecord stream.
///
/// Both checksums are verified. Iteration stops after the first error.
pub struct TfRecordReader<R> {
    reader: R,
    path: PathBuf,
    offset: u64,
    done: bool,
}

impl TfRecordReader<BufReader<File>> {
    /// Opens a TFRecord file.
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(DatasetError::Io)?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: Read> TfRecordReader<R> {
    /// Wraps a reader. `path` is only used in error messages.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
            offset: 0,
            done: false,
        }
    }

    /// Reads the next payload, or `None` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>, DatasetError> {
        let start = self.offset;

        let mut header = [0u8; 12];
        let filled = self.fill(&mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < header.len() {
            return Err(self.frame_error(start, "truncated record header"));
        }

        let mut length_bytes = [0u8; 8];
        let mut crc_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&header[..8]);
        crc_bytes.copy_from_slice(&header[8..]);
        if masked_crc32c(&length_bytes) != u32::from_le_bytes(crc_bytes) {
            return Err(self.frame_error(start, "length checksum mismatch"));
        }
        let length = u64::from_le_bytes(length_bytes);

        // Read through `take` so a corrupt length cannot force a huge allocation.
        let mut payload = Vec::new();
        let read = (&mut self.reader)
            .take(length)
            .read_to_end(&mut payload)
            .map_err(DatasetError::Io)?;
        self.offset += read as u64;
        if (read as u64) < length {
            return Err(self.frame_error(start, "truncated record payload"));
        }

        let mut footer = [0u8; 4];
        if self.fill(&mut footer)? < footer.len() {
            return Err(self.frame_error(start, "truncated record footer"));
        }
        if masked_crc32c(&payload) != u32::from_le_bytes(footer) {
            return Err(self.frame_error(start, "payload checksum mismatch"));
        }

        Ok(Some(payload))
    }

    /// Reads until `buf` is full or the stream ends; returns bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, DatasetError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(DatasetError::Io(err)),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    fn frame_error(&self, offset: u64, message: &str) -> DatasetError {
        DatasetError::RecordFrame {
            path: self.path.clone(),
            offset,
            message: message.to_string(),
        }
    }
}

impl<R: Read> Iterator for TfRecordReader<R> {
    type Item = Result<Vec<u8>, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Splits an in-memory TFRecord stream into payloads.
///
/// This helper is primarily useful for testing/fuzzing parse behavior in-memory.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Vec<u8>>, DatasetError> {
    TfRecordReader::new(bytes, "<memory>").collect()
}

/// Counts the records in a TFRecord file, verifying every checksum.
pub fn count_records(path: &Path) -> Result<usize, DatasetError> {
    let mut count = 0;
    for record in TfRecordReader::open(path)? {
        record?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_crc_of_empty_input() {
        // crc32c("") == 0, so the masked value is the delta itself.
        assert_eq!(masked_crc32c(b""), MASK_DELTA);
    }

    #[test]
    fn masked_crc_matches_rotation_formula() {
        let crc = crc32c::crc32c(b"123456789");
        assert_eq!(crc, 0xe306_9283);
        assert_eq!(
            masked_crc32c(b"123456789"),
            crc.rotate_right(15).wrapping_add(MASK_DELTA)
        );
    }

    #[test]
    fn frame_layout_is_length_crc_payload_crc() {
        let frame = encode_frame(b"abc");
        assert_eq!(frame.len(), 8 + 4 + 3 + 4);
        assert_eq!(&frame[..8], &3u64.to_le_bytes());
        assert_eq!(&frame[8..12], &masked_crc32c(&3u64.to_le_bytes()).to_le_bytes());
        assert_eq!(&frame[12..15], b"abc");
        assert_eq!(&frame[15..], &masked_crc32c(b"abc").to_le_bytes());
    }

    #[test]
    fn reader_returns_payloads_in_order() {
        let mut stream = Vec::new();
        for payload in [&b"first"[..], &b""[..], &b"third"[..]] {
            write_frame(&mut stream, payload).expect("write frame");
        }
        let records = parse_records(&stream).expect("parse stream");
        assert_eq!(records, vec![b"first".to_vec(), Vec::new(), b"third".to_vec()]);
        assert!(parse_records(&[]).expect("empty stream").is_empty());
    }

    #[test]
    fn reader_detects_corruption_and_truncation() {
        let frame = encode_frame(b"payload");

        let mut corrupt = frame.clone();
        corrupt[13] ^= 0xff;
        assert!(matches!(
            parse_records(&corrupt),
            Err(DatasetError::RecordFrame { offset: 0, .. })
        ));

        let mut bad_length = frame.clone();
        bad_length[0] = 0xff;
        assert!(matches!(
            parse_records(&bad_length),
            Err(DatasetError::RecordFrame { .. })
        ));

        for cut in [3, 12, frame.len() - 1] {
            assert!(
                matches!(
                    parse_records(&frame[..cut]),
                    Err(DatasetError::RecordFrame { .. })
                ),
                "expected truncation error at {cut}"
            );
        }
    }

    #[test]
    fn second_record_error_reports_its_offset() {
        let mut stream = encode_frame(b"ok");
        let second_start = stream.len() as u64;
        let mut second = encode_frame(b"broken");
        let last = second.len() - 1;
        second[last] ^= 0x01;
        stream.extend(second);

        match parse_records(&stream) {
            Err(DatasetError::RecordFrame { offset, .. }) => assert_eq!(offset, second_start),
            other => panic!("expected RecordFrame, got {other:?}"),
        }
    }
}
