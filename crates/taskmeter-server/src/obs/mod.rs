//! Request-side metrics plumbing.
//!
//! The registry itself lives in `taskmeter-core`; this module feeds it from
//! the HTTP stack (`track`) and keeps the active-user window trimmed
//! (`sweeper`). Nothing here may fail a request.

pub mod sweeper;
pub mod track;

pub use sweeper::{spawn_sweeper, sweep_once, SweeperHandle, MIN_SWEEP_PERIOD};
pub use track::{record_request, track_requests, UNMATCHED_ROUTE, USER_ID_HEADER};

use taskmeter_core::ErrorCode;

/// Log-and-drop for metric side effects.
///
/// An unregistered metric or a label set that does not match its schema is a
/// bug at the call site: debug builds panic on it, release builds log and
/// carry on like any other metrics failure.
pub(crate) fn report(res: taskmeter_core::Result<()>, what: &'static str) {
    let Err(e) = res else { return };
    let code = e.code();
    debug_assert!(
        !is_call_site_bug(code),
        "metrics call site `{what}` is wrong: {e}"
    );
    tracing::warn!(what, code = code.as_str(), error = %e, "metrics update dropped");
}

fn is_call_site_bug(code: ErrorCode) -> bool {
    matches!(code, ErrorCode::UnknownMetric | ErrorCode::InvalidLabel)
}
