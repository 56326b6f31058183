//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a request-scoped deadline
//! - Cancel the call cleanly when the deadline fires
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the inner future cancels it
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

/// The deadline fired before the guarded future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` with a time budget.
///
/// The timer is armed now and disarmed as soon as `fut` resolves. On expiry
/// `fut` is dropped, which aborts any I/O it owns. Nothing outside this call
/// is affected.
pub async fn with_deadline<F, T>(budget: Duration, fut: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| DeadlineExceeded(budget))
}
