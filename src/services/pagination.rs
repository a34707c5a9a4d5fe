//! Page-boundary arithmetic shared by every list operation.
//!
//! Pages are 1-based. A page past the end is not an error: it yields no items
//! while still reporting the real `total_pages` and a `prev` cursor.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    errors::{AppError, AppResult},
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw `page`/`page_size` query-string values, before any validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageQuery {
    /// Parses the raw values. Blank values count as absent.
    ///
    /// A non-integer `page_size` becomes `Some(0)`, which `Paginator::validate`
    /// rejects against its configured maximum.
    pub fn into_request(self) -> AppResult<PageRequest> {
        let page = parse_int(self.page).map_err(|_| AppError::InvalidPage)?;
        let page_size = parse_int(self.page_size).unwrap_or(Some(0));
        Ok(PageRequest { page, page_size })
    }
}

fn parse_int(raw: Option<String>) -> Result<Option<i64>, std::num::ParseIntError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<i64>().map(Some),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self { page, page_size }
    }
}

/// Contiguous slice of an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: i64,
}

impl PageWindow {
    /// Applies the window to an already ordered in-memory sequence.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX);
        if start >= items.len() {
            return Vec::new();
        }
        let end = start.saturating_add(self.limit.max(0) as usize).min(items.len());
        items[start..end].to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub page: i64,
    pub page_size: i64,
    pub total_items: u64,
    pub total_pages: u64,
    pub next: Option<i64>,
    pub prev: Option<i64>,
}

impl PageBounds {
    /// `None` when the offset cannot be represented, which only happens far
    /// past the end of any result set.
    fn offset(&self) -> Option<u64> {
        ((self.page - 1) as u64).checked_mul(self.page_size as u64)
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            offset: self.offset().unwrap_or(u64::MAX),
            limit: self.page_size,
        }
    }

    pub fn is_past_end(&self) -> bool {
        self.offset()
            .map(|offset| offset >= self.total_items)
            .unwrap_or(true)
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            total_pages: self.total_pages,
            total_items: self.total_items,
            next: self.next,
            prev: self.prev,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: u64,
    pub total_items: u64,
    pub next: Option<i64>,
    pub prev: Option<i64>,
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            total_items: self.total_items,
            next: self.next,
            prev: self.prev,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    default_page_size: i64,
    max_page_size: i64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(default_page_size: i64, max_page_size: i64) -> Self {
        Self {
            default_page_size,
            max_page_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_page_size, config.max_page_size)
    }

    /// Resolves defaults and rejects out-of-range values. Never clamps.
    pub fn validate(&self, request: &PageRequest) -> AppResult<(i64, i64)> {
        let page = request.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::InvalidPage);
        }

        let page_size = request.page_size.unwrap_or(self.default_page_size);
        if page_size < 1 || page_size > self.max_page_size {
            return Err(AppError::InvalidPageSize {
                max: self.max_page_size,
            });
        }

        Ok((page, page_size))
    }

    pub fn bounds(&self, total_count: u64, request: &PageRequest) -> AppResult<PageBounds> {
        let (page, page_size) = self.validate(request)?;
        let total_pages = total_count.div_ceil(page_size as u64);

        Ok(PageBounds {
            page,
            page_size,
            total_items: total_count,
            total_pages,
            next: ((page as u64) < total_pages).then(|| page + 1),
            prev: (page > 1).then(|| page - 1),
        })
    }

    /// Validates the request, computes the bounds and fetches exactly the
    /// page window. `fetch` is skipped when the window lies past the end.
    pub async fn paginate<T, F, Fut>(
        &self,
        total_count: u64,
        request: PageRequest,
        fetch: F,
    ) -> AppResult<Page<T>>
    where
        F: FnOnce(PageWindow) -> Fut,
        Fut: Future<Output = AppResult<Vec<T>>>,
    {
        let bounds = self.bounds(total_count, &request)?;
        if bounds.is_past_end() {
            return Ok(bounds.into_page(Vec::new()));
        }

        let mut items = fetch(bounds.window()).await?;
        items.truncate(bounds.page_size as usize);
        Ok(bounds.into_page(items))
    }
}
