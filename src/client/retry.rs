//! Retry combinator.
//!
//! Both retry sites (socket dial plus discovery at open, and every
//! confirmed operation) share this loop: up to `budget + 1` invocations of
//! the attempt closure, stopping early on errors that resending cannot fix
//! (see [`Error::is_retriable`](crate::error::Error::is_retriable)).

use crate::error::Result;

/// Run `attempt` up to `budget + 1` times.
///
/// The closure receives the zero-based attempt number. The error of the
/// final attempt is returned unchanged.
pub(crate) async fn run<T>(
    budget: u32,
    mut attempt: impl AsyncFnMut(u32) -> Result<T>,
) -> Result<T> {
    let mut attempt_no = 0;
    loop {
        match attempt(attempt_no).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt_no < budget && err.is_retriable() => {
                tracing::debug!(
                    target: "snmp_session::client",
                    attempt = attempt_no,
                    budget,
                    error = %err,
                    "attempt failed, retrying"
                );
                attempt_no += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
