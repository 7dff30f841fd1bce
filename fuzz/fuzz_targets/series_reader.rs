#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;

use gravtime_core::SeriesId;
use gravtime_series::{format_row, parse_series};

fuzz_target!(|data: &[u8]| {
    let Ok(series) = parse_series(SeriesId::new("fuzz"), Cursor::new(data)) else {
        return;
    };
    // accepted rows are ordered and re-encode to parseable rows
    for pair in series.records().windows(2) {
        assert!(pair[0].altitude < pair[1].altitude);
    }
    for (i, record) in series.iter().enumerate() {
        let line = format_row(record);
        assert!(gravtime_series::parse_row(i + 1, &line).is_ok());
    }
});
