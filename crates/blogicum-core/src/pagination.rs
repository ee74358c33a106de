//! Page-number pagination for listing pages.

use std::num::IntErrorKind;

use serde::Serialize;

/// Raw page selector as it arrives in the `page` query parameter.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub number: Option<String>,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(number: Option<String>, per_page: u64) -> Self {
        Self { number, per_page }
    }
}

/// Resolved slice of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number after clamping.
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// Splits `count` items into pages of `per_page`.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// An empty result set still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Resolve a requested page number.
    ///
    /// Missing or non-numeric input selects the first page; numbers outside
    /// `1..=num_pages` clamp to the nearest valid page.
    pub fn window(&self, requested: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages();
        let number = match requested.map(|raw| raw.trim().parse::<i64>()) {
            Some(Ok(n)) => n.clamp(1, num_pages as i64) as u64,
            Some(Err(e)) if *e.kind() == IntErrorKind::PosOverflow => num_pages,
            _ => 1,
        };

        PageWindow {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}
