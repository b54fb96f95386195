use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 10;

/// `?page=&limit=` query parameters, 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PageParams {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).max(1)
    }

    /// Saturates instead of overflowing on absurd page numbers.
    pub fn skip(&self) -> usize {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// `LIMIT` bind value.
    pub fn sql_limit(&self) -> i64 {
        i64::try_from(self.limit()).unwrap_or(i64::MAX)
    }

    /// `OFFSET` bind value.
    pub fn sql_offset(&self) -> i64 {
        i64::try_from(self.skip()).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_docs: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Wraps one already-fetched page given the total row count from SQL.
    pub fn from_rows(items: Vec<T>, params: PageParams, total: i64) -> Self {
        Page {
            items,
            pagination: pagination(params, usize::try_from(total).unwrap_or(0)),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

pub fn pagination(params: PageParams, total_docs: usize) -> Pagination {
    let limit = params.limit();
    let current_page = params.page();
    let total_pages = total_docs.div_ceil(limit);
    Pagination {
        current_page,
        total_pages,
        total_docs,
        has_next_page: current_page < total_pages,
        has_prev_page: current_page > 1,
    }
}

/// Slices an already-ordered collection into one page.
pub fn paginate<T>(items: Vec<T>, params: PageParams) -> Page<T> {
    let pagination = pagination(params, items.len());
    let items = items
        .into_iter()
        .skip(params.skip())
        .take(params.limit())
        .collect();
    Page { items, pagination }
}
