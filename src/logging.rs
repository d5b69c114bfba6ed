//! Log setup and id formatting helpers.
//!
//! Log lines look like:
//!
//! ```text
//! 20260211T21:33:12.000  INFO startuplink::web: listening on 0.0.0.0:4000
//! ```
//!
//! The filter comes from the caller (CLI flag) and falls back to `info` when
//! it does not parse.

use std::fmt;
use std::io::IsTerminal;
use std::time::SystemTime;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Later calls are ignored, so tests and
/// embedders can call this freely.
pub fn init(filter: &str) {
    let env_filter =
        EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(CompactTimestamp)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

struct CompactTimestamp;

impl FormatTime for CompactTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", format_timestamp(SystemTime::now()))
    }
}

/// Format a wall-clock time as `YYYYMMDDTHH:MM:SS.mmm` (UTC).
pub fn format_timestamp(at: SystemTime) -> String {
    let duration = at.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let minutes = (time_secs % 3600) / 60;
    let seconds = time_secs % 60;

    // Civil date from days since epoch (Howard Hinnant's algorithm).
    let days = (secs / 86400) as i64;
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{y:04}{m:02}{d:02}T{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

const SHORT_ID_LEN: usize = 7;

/// First seven characters of an id, split on a char boundary.
pub fn short_id(id: &str) -> &str {
    let end = id
        .char_indices()
        .nth(SHORT_ID_LEN)
        .map(|(i, _)| i)
        .unwrap_or(id.len());
    &id[..end]
}

/// `u-` prefixed short form of a user id.
pub fn user_id(id: &str) -> String {
    format!("u-{}", short_id(id))
}

/// `s-` prefixed short form of a startup id.
pub fn startup_id(id: &str) -> String {
    format!("s-{}", short_id(id))
}
