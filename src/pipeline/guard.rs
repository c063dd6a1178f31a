use std::future::Future;

use crate::error::AppResult;
use crate::pipeline::dataset::Dataset;

/// Default maximum number of rows fetched for a single plot.
pub const ROW_LIMIT: usize = 10_000;

/// A result that may have been cut short by a row cap.
#[derive(Debug, Clone, PartialEq)]
pub struct Limited<T> {
    pub data: T,
    pub truncated: bool,
}

/// User-facing notice shown next to a truncated plot.
#[must_use]
pub fn truncation_warning(limit: usize) -> String {
    format!("Large amount of data - the query has been limited to the latest {limit} datapoints.")
}

/// Run `query_fn` with a hard cap of `limit` rows and report whether the cap was hit.
///
/// Reaching the cap is not an error. If the fetch ignores the cap, only the
/// latest `limit` rows are kept. Fetch errors propagate unchanged.
///
/// # Errors
///
/// Returns whatever error `query_fn` returns.
pub async fn fetch_with_limit<F, Fut>(limit: usize, query_fn: F) -> AppResult<Limited<Dataset>>
where
    F: FnOnce(usize) -> Fut,
    Fut: Future<Output = AppResult<Dataset>>,
{
    let dataset = query_fn(limit).await?;
    let truncated = dataset.len() >= limit;

    let data = if dataset.len() > limit {
        tracing::debug!(
            rows = dataset.len(),
            limit,
            "fetch returned more rows than the cap, keeping the latest"
        );
        dataset.sorted_by_time().tail(limit)
    } else {
        dataset
    };

    if truncated {
        tracing::info!(limit, "row limit reached");
    }

    Ok(Limited { data, truncated })
}
