//! Forward pass over the result pages of one partition

use crate::crawler::api::{SearchApi, PER_PAGE};
use crate::state::{DateRange, SearchTarget};
use crate::{CityError, Result};
use tokio_util::sync::CancellationToken;

/// Pages the search endpoint can serve for one query
const MAX_PAGES: u32 = 10;

/// Number of pages needed for `total` results
fn page_count(total: u64) -> u32 {
    let pages = total / u64::from(PER_PAGE) + 1;
    pages.min(u64::from(MAX_PAGES)) as u32
}

/// Walks pages 1..N of a search, where N follows the latest `total_count`
///
/// Logins are emitted in server order; duplicates pass through untouched.
pub struct SearchPager<'a, A: ?Sized> {
    api: &'a A,
    target: &'a SearchTarget,
    range: Option<&'a DateRange>,
    next: u32,
    last: u32,
    cancel: CancellationToken,
}

impl<'a, A: SearchApi + ?Sized> SearchPager<'a, A> {
    pub fn new(api: &'a A, target: &'a SearchTarget, range: Option<&'a DateRange>) -> Self {
        Self {
            api,
            target,
            range,
            next: 1,
            last: 1,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches the next page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(logins))` - The logins of the next page
    /// * `Ok(None)` - The pass is complete
    /// * `Err(CityError)` - The page could not be fetched; the pass should be abandoned
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.next > self.last {
            return Ok(None);
        }
        if self.cancel.is_cancelled() {
            return Err(CityError::Cancelled);
        }

        let page = self
            .api
            .search_page(self.target, self.range, self.next)
            .await?;

        self.last = page_count(page.total_count);
        tracing::debug!(
            "Page {}/{} of {}: {} users",
            self.next,
            self.last,
            self.range.map_or_else(|| "all dates".to_string(), |r| r.to_string()),
            page.items.len()
        );
        self.next += 1;

        if page.items.is_empty() {
            self.next = self.last + 1;
            return Ok(None);
        }

        Ok(Some(page.items.into_iter().map(|item| item.login).collect()))
    }
}
