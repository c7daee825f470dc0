#![no_main]

use arbitrary::Arbitrary;
use doorward_core::LogRecord;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Row<'a> {
    time: &'a str,
    event: &'a str,
    who: &'a str,
    dist: &'a str,
}

fuzz_target!(|row: Row<'_>| {
    // Parsing arbitrary columns must not panic
    if let Ok(record) = LogRecord::from_fields(row.time, row.event, row.who, row.dist) {
        assert_eq!(record.event.as_str(), row.event);
        assert_eq!(record.subject.is_none(), row.who.is_empty());
    }
});
