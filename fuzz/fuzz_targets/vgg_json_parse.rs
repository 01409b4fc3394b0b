//! Fuzz target for VGG JSON parsing.
//!
//! Both region layouts (mapping and list) go through the same parser, so
//! arbitrary UTF-8 documents exercise normalization and region conversion.

#![no_main]

use libfuzzer_sys::fuzz_target;
use dataset_maker::ir::io_vgg_json::from_vgg_json_str;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    let _ = from_vgg_json_str(json);
});
