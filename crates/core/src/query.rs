//! Listing helpers shared by the patient and doctor services: pagination and sort parsing.

use crate::constants::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT};
use serde::Serialize;

/// A 1-based page request. Construct with [`PageRequest::from_raw`] to get the lenient parsing
/// used for query strings.
///
/// Both values are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl PageRequest {
    /// Zero values are raised to 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Missing, unparsable, negative or zero values fall back to page 1 and limit 10.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(
            positive_or(page, DEFAULT_PAGE),
            positive_or(limit, DEFAULT_PAGE_LIMIT),
        )
    }

    fn offset(self) -> usize {
        (self.page as usize)
            .saturating_sub(1)
            .saturating_mul(self.limit as usize)
    }
}

/// One page of results plus the totals a client needs to render pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub total_pages: usize,
    pub current_page: u32,
}

impl<T> Page<T> {
    /// Cuts one page out of an already filtered and sorted list.
    pub fn paginate(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len();
        let limit = request.limit as usize;
        let total_pages = total.div_ceil(limit);

        let items = items
            .into_iter()
            .skip(request.offset())
            .take(limit)
            .collect();

        Self {
            items,
            total,
            total_pages,
            current_page: request.page,
        }
    }
}

/// A parsed `sort` parameter: a field name with an optional leading `-` for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub descending: bool,
}

impl<F: Copy> SortSpec<F> {
    /// Parses `raw`, falling back to `default` ascending when the field is empty or unknown.
    pub fn parse(raw: Option<&str>, lookup: impl Fn(&str) -> Option<F>, default: F) -> Self {
        let fallback = Self {
            field: default,
            descending: false,
        };

        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return fallback;
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        match lookup(name) {
            Some(field) => Self { field, descending },
            None => fallback,
        }
    }
}
