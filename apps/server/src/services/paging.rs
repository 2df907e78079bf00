//! Page planning for annotation containers
//!
//! Pages are numbered from 0. The last page index is
//! `max(0, ceil(total / per_page) - 1)`, so an empty collection still has a
//! page 0 with no items.

use serde::Serialize;

use crate::{Error, Result};

/// Boundaries of one AnnotationPage within a filtered, ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageDescriptor {
    pub page: u64,
    pub per_page: usize,
    pub total: u64,
    pub last_page: u64,
    /// Offset of the page's first item in the whole result
    pub start_index: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageDescriptor {
    /// Store window covering exactly this page.
    pub fn window(&self) -> crate::db::Window {
        crate::db::Window::new(self.start_index, self.per_page as u64)
    }
}

/// Index of the last page for `total` items.
pub fn last_page(total: u64, per_page: usize) -> Result<u64> {
    if per_page == 0 {
        return Err(Error::Config("per_page must be at least 1".to_string()));
    }
    Ok(total.div_ceil(per_page as u64).saturating_sub(1))
}

/// Plan page `page` of a result with `total` items.
///
/// # Errors
/// * `NotFound` - `page` is negative or beyond the last page
/// * `Config` - `per_page` is zero
pub fn plan_page(total: u64, per_page: usize, page: i64) -> Result<PageDescriptor> {
    let last_page = last_page(total, per_page)?;
    let page = u64::try_from(page)
        .ok()
        .filter(|p| *p <= last_page)
        .ok_or_else(|| Error::NotFound(format!("page {page} (last page is {last_page})")))?;

    Ok(PageDescriptor {
        page,
        per_page,
        total,
        last_page,
        start_index: page.saturating_mul(per_page as u64),
        has_prev: page > 0,
        has_next: page < last_page,
    })
}
