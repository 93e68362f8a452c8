use crate::transaction::TRANSACTION_HOOK;
use tracing::warn;

/// Record a named assertion for the end of test summary.
///
/// Checks never alter control flow; the result is handed back so callers can react to it.
///
/// # Example
/// ```ignore
/// use booker::prelude::*;
///
/// let res = client.list_bookings().await?;
/// check("status is 200", res.status == 200);
/// ```
pub fn check(name: &str, passed: bool) -> bool {
    if TRANSACTION_HOOK
        .try_with(|hook| hook.registry.record_check(name, passed))
        .is_err()
    {
        warn!(check = name, "No hook available; check not recorded.");
    }
    passed
}
