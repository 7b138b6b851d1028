//! Line protocol of the engine's diagnostic stream
//!
//! rclone run with `--use-json-log` writes one JSON object per line to
//! stderr. Each line is parsed on its own; a line that is not a JSON object
//! with a `level` string is reported as malformed and skipped, it never ends
//! the stream.

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Severity of a status line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// `"error"`
    Error,
    /// `"warning"`
    Warning,
    /// `"info"`
    Info,
    /// Any other level (`"notice"`, `"debug"`, ...)
    Other(String),
}

impl Severity {
    /// Map the raw `level` field
    pub fn from_level(level: &str) -> Self {
        match level {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            "info" => Severity::Info,
            other => Severity::Other(other.to_string()),
        }
    }

    /// Whether lines of this severity reach the aggregator
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Severity::Error | Severity::Warning)
    }
}

/// One in-flight transfer reported inside an engine stats block
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferringItem {
    /// Item name
    #[serde(default)]
    pub name: String,
    /// Bytes moved so far
    #[serde(default)]
    pub bytes: u64,
    /// Item size
    #[serde(default)]
    pub size: u64,
    /// Average speed of this item in bytes/s
    #[serde(default)]
    pub speed_avg: Option<f64>,
}

/// Cumulative totals the engine reports in its periodic stats block
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Bytes transferred so far
    #[serde(default)]
    pub bytes: u64,
    /// Bytes expected in total
    #[serde(default)]
    pub total_bytes: u64,
    /// Completed transfers
    #[serde(default)]
    pub transfers: u64,
    /// Expected transfers
    #[serde(default)]
    pub total_transfers: u64,
    /// Deleted items
    #[serde(default)]
    pub deletes: u64,
    /// Errors the engine has counted
    #[serde(default)]
    pub errors: u64,
    /// Current overall speed in bytes/s
    #[serde(default)]
    pub speed: Option<f64>,
    /// Estimated seconds remaining
    #[serde(default)]
    pub eta: Option<f64>,
    /// Items currently in flight
    #[serde(default)]
    pub transferring: Vec<TransferringItem>,
}

/// One parsed status line
#[derive(Clone, Debug, PartialEq)]
pub struct StatusEvent {
    /// Line severity
    pub level: Severity,
    /// Log message
    pub msg: Option<String>,
    /// Item the line is about
    pub object: Option<String>,
    /// Error payload, when the engine attached one
    pub error: Option<String>,
    /// Bytes moved by this event
    pub bytes: Option<u64>,
    /// Whether the line reports a deletion
    pub deleted: bool,
    /// Average speed of the item in bytes/s
    pub speed: Option<f64>,
    /// Periodic engine totals
    pub stats: Option<EngineStats>,
}

impl StatusEvent {
    /// Event with only a severity set
    pub fn new(level: Severity) -> Self {
        Self {
            level,
            msg: None,
            object: None,
            error: None,
            bytes: None,
            deleted: false,
            speed: None,
            stats: None,
        }
    }

    /// Whether this event reports a deletion
    pub fn is_deletion(&self) -> bool {
        self.deleted || self.msg.as_deref() == Some("Deleted")
    }
}

#[derive(Deserialize)]
struct RawLine {
    level: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    object: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    stats: Option<EngineStats>,
}

impl From<RawLine> for StatusEvent {
    fn from(raw: RawLine) -> Self {
        Self {
            level: Severity::from_level(&raw.level),
            msg: raw.msg,
            object: raw.object,
            error: raw.error,
            bytes: raw.bytes,
            deleted: raw.deleted,
            speed: raw.speed,
            stats: raw.stats,
        }
    }
}

/// Outcome of parsing one line
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedLine {
    /// An error or warning line for the aggregator
    Event(StatusEvent),
    /// A well-formed line of a level the worker does not act on
    Ignored(Severity),
    /// A blank line
    Blank,
    /// A line that is not a valid status object
    Malformed(String),
}

/// Parse one raw line
pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParsedLine::Blank;
    }
    match serde_json::from_str::<RawLine>(trimmed) {
        Ok(raw) => {
            let event = StatusEvent::from(raw);
            if event.level.is_forwarded() {
                ParsedLine::Event(event)
            } else {
                ParsedLine::Ignored(event.level)
            }
        }
        Err(e) => ParsedLine::Malformed(e.to_string()),
    }
}

/// Reads raw lines from the diagnostic stream
///
/// `next_line` is cancellation safe: partially read bytes stay buffered
/// inside the parser, so it can sit in a `tokio::select!` next to the
/// cancellation branches of the run loop.
pub struct LineProtocolParser<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    finished: bool,
    lines_read: u64,
    malformed: u64,
}

impl<R: AsyncRead + Unpin> LineProtocolParser<R> {
    /// Wrap a byte stream
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            finished: false,
            lines_read: 0,
            malformed: 0,
        }
    }

    /// Next raw line without its terminator, `None` at end of stream
    ///
    /// Invalid UTF-8 is replaced rather than treated as a stream fault. Once
    /// the stream has ended every further call returns `None`.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        if self.finished {
            return Ok(None);
        }
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            self.finished = true;
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        self.lines_read += 1;
        Ok(Some(line))
    }

    /// Next forwarded event, skipping ignored, blank and malformed lines
    pub async fn next_event(&mut self) -> std::io::Result<Option<StatusEvent>> {
        while let Some(line) = self.next_line().await? {
            match parse_line(&line) {
                ParsedLine::Event(event) => return Ok(Some(event)),
                ParsedLine::Malformed(reason) => self.record_malformed(&line, &reason),
                ParsedLine::Ignored(_) | ParsedLine::Blank => {}
            }
        }
        Ok(None)
    }

    /// Count and log a line that failed to parse
    pub fn record_malformed(&mut self, line: &str, reason: &str) {
        self.malformed += 1;
        tracing::error!(line = %line, reason = %reason, "unparseable status line");
    }

    /// Lines read so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Malformed lines seen so far
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }
}
