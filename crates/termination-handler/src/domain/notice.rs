use chrono::{DateTime, Utc};
use tracing::debug;

/// Metadata key that carries the spot termination time once a notice is issued.
pub const TERMINATION_TIME_KEY: &str = "spot/termination-time";

/// A positive termination determination from a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationNotice {
    pub termination_time: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

/// Maps one metadata query result onto the terminating / not-terminating
/// decision. `None` means not terminating.
///
/// Query failures are not distinguished from "no notice": a 404, a refused
/// connection and a 500 all yield `None`. A value that is not RFC 3339 is
/// read as the Unix epoch.
pub fn evaluate(result: anyhow::Result<String>, now: DateTime<Utc>) -> Option<TerminationNotice> {
    let value = match result {
        Ok(value) => value,
        Err(e) => {
            debug!("termination time query failed: {:#}", e);
            return None;
        }
    };

    let termination_time = parse_termination_time(&value);

    // NOTE: a live notice normally carries a time at or shortly before now,
    // so "strictly after now" looks inverted. Kept literal, see DESIGN.md.
    if termination_time > now {
        Some(TerminationNotice {
            termination_time,
            observed_at: now,
        })
    } else {
        None
    }
}

pub fn parse_termination_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            debug!("unparseable termination time '{}': {}", value, e);
            DateTime::<Utc>::default()
        })
}
