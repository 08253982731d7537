//! Offset pagination over provider collections
//!
//! Providers return fixed-size pages plus an "is last page" signal. Pages are
//! fetched strictly one after another: page N+1 is only requested once page N
//! has been inspected.

use crate::ScrumboardError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fixed page size requested from every provider
pub const PAGE_SIZE: u32 = 50;

/// One page of a provider collection
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub values: Vec<T>,
    pub is_last: bool,
}

impl<T> Page<T> {
    pub fn new(values: Vec<T>, is_last: bool) -> Self {
        Self { values, is_last }
    }

    /// For providers without an explicit flag: a short page is the last one
    pub fn from_short_page(values: Vec<T>) -> Self {
        let is_last = values.len() < PAGE_SIZE as usize;
        Self { values, is_last }
    }
}

/// Why pagination stopped
#[derive(Debug)]
pub enum PageStop {
    /// The provider flagged the last page
    Completed,
    /// A non-last page came back empty
    EmptyPage,
    /// The token was cancelled before the next request
    Cancelled,
    /// Fetching page `page` (1-based) failed
    Failed { page: u32, error: ScrumboardError },
}

#[derive(Debug)]
pub struct Paginated {
    /// Pages successfully fetched
    pub pages: u32,
    pub stop: PageStop,
}

/// Fetch pages from `start_at = 0`, advancing by [`PAGE_SIZE`], until the
/// provider signals the last page. Each page is handed to `sink` as soon as
/// it arrives.
pub async fn paginate<T, F, Fut, S>(
    what: &str,
    cancel: &CancellationToken,
    mut fetch: F,
    mut sink: S,
) -> Paginated
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = crate::Result<Page<T>>>,
    S: FnMut(Vec<T>),
{
    let mut start_at = 0u32;
    let mut pages = 0u32;

    loop {
        if cancel.is_cancelled() {
            debug!(what, pages, "Pagination cancelled");
            return Paginated {
                pages,
                stop: PageStop::Cancelled,
            };
        }

        let page = match fetch(start_at).await {
            Ok(page) => page,
            Err(error) => {
                return Paginated {
                    pages,
                    stop: PageStop::Failed {
                        page: pages + 1,
                        error,
                    },
                }
            }
        };
        pages += 1;

        let empty = page.values.is_empty();
        let is_last = page.is_last;
        debug!(what, start_at, returned = page.values.len(), is_last, "Fetched page");
        sink(page.values);

        if is_last {
            return Paginated {
                pages,
                stop: PageStop::Completed,
            };
        }
        if empty {
            warn!(what, start_at, "Provider returned an empty page not flagged as last, stopping");
            return Paginated {
                pages,
                stop: PageStop::EmptyPage,
            };
        }

        start_at += PAGE_SIZE;
    }
}

/// Collect a whole collection, failing on the first page error
pub async fn collect_all<T, F, Fut>(what: &str, fetch: F) -> crate::Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = crate::Result<Page<T>>>,
{
    let mut values = Vec::new();
    let outcome =
        paginate(what, &CancellationToken::new(), fetch, |page| values.extend(page)).await;
    match outcome.stop {
        PageStop::Failed { error, .. } => Err(error),
        _ => Ok(values),
    }
}
