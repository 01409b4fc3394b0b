//! Fuzz target for VOC XML parsing.
//!
//! Covers the `<filename>`/`<file>` lookup and the integer coordinate
//! parser, which also accepts integral floats such as `30.0`.

#![no_main]

use dataset_maker::ir::io_voc_xml::from_voc_xml_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_voc_xml_slice(data);
});
