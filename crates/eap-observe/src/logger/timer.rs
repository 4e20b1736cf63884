use std::fmt;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

/// RFC 3339 timestamps in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcRfc3339;

impl FormatTime for UtcRfc3339 {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write_rfc3339(w, OffsetDateTime::now_utc())
    }
}

fn write_rfc3339(w: &mut impl fmt::Write, at: OffsetDateTime) -> fmt::Result {
    match at.format(&Rfc3339) {
        Ok(ts) => write!(w, "{ts} "),
        Err(_) => w.write_str("<invalid-time> "),
    }
}
