//! Fuzz target for TFRecord framing and Example decoding.

#![no_main]

use dataset_maker::tfrecord::{parse_records, Example};
use libfuzzer_sys::fuzz_target;
use prost::Message;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(records) = parse_records(data) {
        for payload in records {
            let _ = Example::decode(payload.as_slice());
        }
    }
});
