//! Core traits for the runner architecture

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::{RawOutcome, RunRequest};

/// A backend that executes a compiled test bundle.
///
/// Runners never fail with an error: infrastructure problems come back as
/// [`RawOutcome::Crashed`]. Every resource a runner acquires (processes,
/// servers, browser sessions) is released before `execute` returns, also when
/// `cancel` fires or the returned future is dropped.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run the bundle once and report what happened
    async fn execute(&self, request: &RunRequest, cancel: CancellationToken) -> RawOutcome;

    /// Get the name of this runner
    fn name(&self) -> &'static str;
}
