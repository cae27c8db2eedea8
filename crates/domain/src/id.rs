//! Run identifiers.

use uuid::Uuid;

/// Generates an id for one run, used to correlate log lines.
///
/// UUID v7 embeds a timestamp, so ids sort by start time.
#[must_use]
pub fn generate_run_id() -> String {
    Uuid::now_v7().to_string()
}
