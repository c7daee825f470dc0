//! Append-only access event log
//!
//! One record per meaningful transition. The on-disk form is a CSV file with
//! a `time,event,who,dist` header written when the file is first created.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{Error, Result};

/// Timestamp format used in the log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of logged event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    SilentToggle,
    GrantedFace,
    DeniedNoFace,
    DeniedUnknown,
    DeniedFace,
    GrantedPin,
    EmergencyPin,
    BadPin,
    Lockout,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Start,
        EventKind::SilentToggle,
        EventKind::GrantedFace,
        EventKind::DeniedNoFace,
        EventKind::DeniedUnknown,
        EventKind::DeniedFace,
        EventKind::GrantedPin,
        EventKind::EmergencyPin,
        EventKind::BadPin,
        EventKind::Lockout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::SilentToggle => "silent_toggle",
            EventKind::GrantedFace => "granted_face",
            EventKind::DeniedNoFace => "denied_no_face",
            EventKind::DeniedUnknown => "denied_unknown",
            EventKind::DeniedFace => "denied_face",
            EventKind::GrantedPin => "granted_pin",
            EventKind::EmergencyPin => "emergency_pin",
            EventKind::BadPin => "bad_pin",
            EventKind::Lockout => "lockout",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidLogRecord(format!("unknown event kind: {}", s)))
    }
}

/// Numeric detail attached to a record
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Detail {
    /// Match distance, written with three decimals
    Distance(f64),
    /// Running bad-PIN count
    Tries(u32),
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detail::Distance(d) => write!(f, "{:.3}", d),
            Detail::Tries(n) => write!(f, "{}", n),
        }
    }
}

/// One log entry
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub event: EventKind,
    pub subject: Option<String>,
    pub detail: Option<Detail>,
}

/// CSV row layout; field order defines the header
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    time: String,
    event: String,
    who: String,
    dist: String,
}

impl LogRecord {
    /// Record stamped with the current local time, truncated to seconds
    pub fn now(event: EventKind) -> Self {
        let timestamp = Local::now().naive_local();
        Self {
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
            event,
            subject: None,
            detail: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Build a record from the four CSV columns
    pub fn from_fields(time: &str, event: &str, who: &str, dist: &str) -> Result<Self> {
        let timestamp = NaiveDateTime::parse_from_str(time, TIMESTAMP_FORMAT)
            .map_err(|e| Error::InvalidLogRecord(format!("bad timestamp {:?}: {}", time, e)))?;
        let event: EventKind = event.parse()?;
        let subject = (!who.is_empty()).then(|| who.to_string());
        let detail = if dist.is_empty() {
            None
        } else if event == EventKind::BadPin {
            Some(Detail::Tries(dist.parse().map_err(|_| {
                Error::InvalidLogRecord(format!("bad try count: {}", dist))
            })?))
        } else {
            Some(Detail::Distance(dist.parse().map_err(|_| {
                Error::InvalidLogRecord(format!("bad distance: {}", dist))
            })?))
        };
        Ok(Self {
            timestamp,
            event,
            subject,
            detail,
        })
    }

    fn to_row(&self) -> CsvRow {
        CsvRow {
            time: self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            event: self.event.as_str().to_string(),
            who: self.subject.clone().unwrap_or_default(),
            dist: self.detail.map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

/// Append-only sink for log records
pub trait EventSink {
    fn append(&mut self, record: &LogRecord) -> Result<()>;
}

/// CSV file sink
#[derive(Clone, Debug)]
pub struct CsvEventLog {
    path: PathBuf,
}

impl CsvEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back from a log file
    pub fn read_all(path: &Path) -> Result<Vec<LogRecord>> {
        let mut reader = csv::Reader::from_path(path)?;
        reader
            .deserialize::<CsvRow>()
            .map(|row| {
                let row = row?;
                LogRecord::from_fields(&row.time, &row.event, &row.who, &row.dist)
            })
            .collect()
    }
}

impl EventSink for CsvEventLog {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let new_file = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer.serialize(record.to_row())?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory sink
#[derive(Clone, Debug, Default)]
pub struct MemoryEventLog {
    records: Vec<LogRecord>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.records.iter().map(|r| r.event).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.records.iter().filter(|r| r.event == kind).count()
    }
}

impl EventSink for MemoryEventLog {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Wraps a sink so write failures are reported but never abort a cycle
#[derive(Debug)]
pub struct EventRecorder<L> {
    sink: L,
}

impl<L: EventSink> EventRecorder<L> {
    pub fn new(sink: L) -> Self {
        Self { sink }
    }

    pub fn record(&mut self, record: LogRecord) {
        if let Err(e) = self.sink.append(&record) {
            error!("Failed to append {} event: {}", record.event, e);
        }
    }

    pub fn event(&mut self, event: EventKind) {
        self.record(LogRecord::now(event));
    }

    pub fn sink(&self) -> &L {
        &self.sink
    }
}
