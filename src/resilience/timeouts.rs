//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend calls and health probes with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - A forward that times out counts as a transient failure

use std::future::Future;
use std::time::Duration;

pub use tokio::time::error::Elapsed;

/// Run `future` to completion or give up after `deadline`.
///
/// Dropping the returned future cancels the inner one.
pub async fn with_deadline<F: Future>(deadline: Duration, future: F) -> Result<F::Output, Elapsed> {
    tokio::time::timeout(deadline, future).await
}
