//! Fuzz target for YOLO label lines (`class a b w h`).

#![no_main]

use dataset_maker::ir::io_yolo::fuzz_parse_label_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    // Label files are read line by line; feed every line separately.
    for line in line.lines().take(1024) {
        let _ = fuzz_parse_label_line(line);
    }
});
