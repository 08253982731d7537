//! Bounded concurrent flag dispatch

use crate::error::{FlagFailure, MutationError};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::future::Future;
use tracing::{info, warn};

/// Run `flag_one` for every issue with at most `concurrency` requests in
/// flight. Failures are collected, never short-circuited.
pub async fn flag_each<F, Fut>(
    provider: &str,
    issue_ids: &BTreeSet<String>,
    concurrency: usize,
    flag_one: F,
) -> Result<(), MutationError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = crate::Result<()>>,
{
    if issue_ids.is_empty() {
        return Ok(());
    }

    let mut failures: Vec<FlagFailure> = stream::iter(issue_ids.iter().cloned())
        .map(|issue_id| {
            let update = flag_one(issue_id.clone());
            async move { (issue_id, update.await) }
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|(issue_id, result)| async move {
            result.err().map(|e| {
                warn!(issue = %issue_id, error = %e, "Failed to flag issue as printed");
                FlagFailure {
                    issue_id,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
        .await;

    info!(
        provider,
        requested = issue_ids.len(),
        failed = failures.len(),
        "Flagged issues as printed"
    );

    if failures.is_empty() {
        Ok(())
    } else {
        failures.sort_by(|a, b| a.issue_id.cmp(&b.issue_id));
        Err(MutationError { failures })
    }
}
