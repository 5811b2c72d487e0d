//! Draining paginated endpoints.

use std::future::Future;

use futures::future::try_join_all;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::M2MClient;
use crate::error::Result;

/// One page of a list endpoint. `pages` is the total page count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
}

/// Query parameters sent for a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageParams {
    pub page: u32,
    pub per_page: u32,
}

impl PageParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

/// Cursor over the pages returned by `fetch`.
///
/// Iteration is lazy and not restartable; build a new paginator to start over.
pub struct Paginator<F> {
    fetch: F,
    per_page: u32,
    page: u32,
    pages: Option<u32>,
}

impl<F> Paginator<F> {
    pub fn new(per_page: u32, fetch: F) -> Self {
        Self { fetch, per_page, page: 1, pages: None }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Next page sequential iteration will fetch.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Total page count, known after the first fetch.
    pub fn pages(&self) -> Option<u32> {
        self.pages
    }
}

impl<F, Fut, T> Paginator<F>
where
    F: FnMut(PageParams) -> Fut,
    Fut: Future<Output = Result<PaginatedResponse<T>>>,
{
    /// Fetch the next page, or `None` once every page has been returned.
    ///
    /// A failed fetch leaves the cursor where it was.
    pub async fn next_page(&mut self) -> Option<Result<PaginatedResponse<T>>> {
        if self.pages.is_some_and(|pages| self.page > pages) {
            return None;
        }

        let response = match (self.fetch)(PageParams::new(self.page, self.per_page)).await {
            Ok(response) => response,
            Err(err) => return Some(Err(err)),
        };
        self.pages = Some(response.pages);
        self.page += 1;
        Some(Ok(response))
    }

    /// Fetch page `page` directly. Sequential iteration continues after it.
    pub async fn get(&mut self, page: u32) -> Result<PaginatedResponse<T>> {
        let response = (self.fetch)(PageParams::new(page, self.per_page)).await?;
        self.pages = Some(response.pages);
        self.page = page.saturating_add(1);
        Ok(response)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<PaginatedResponse<T>>> {
        futures::stream::unfold(self, |mut paginator| async move {
            paginator.next_page().await.map(|page| (page, paginator))
        })
    }
}

/// Every item of every page, in page order.
///
/// Page 1 is fetched first to learn the page count; the remaining pages are then
/// requested together and joined in page order, whatever order they finish in.
pub async fn fetch_all<F, Fut, T>(client: &M2MClient, per_page: u32, fetch: F) -> Result<Vec<T>>
where
    F: Fn(M2MClient, PageParams) -> Fut,
    Fut: Future<Output = Result<PaginatedResponse<T>>>,
{
    let first_page = fetch(client.clone(), PageParams::new(1, per_page)).await?;
    if first_page.pages <= 1 {
        return Ok(first_page.items);
    }

    debug!("fetching pages 2..={} concurrently", first_page.pages);
    let remaining_pages = try_join_all(
        (2..=first_page.pages).map(|page| fetch(client.clone(), PageParams::new(page, per_page))),
    )
    .await?;

    let mut items = first_page.items;
    for page in remaining_pages {
        items.extend(page.items);
    }
    Ok(items)
}
