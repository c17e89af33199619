//! Use cases the web layer calls. Each takes the active repository, reads or
//! writes entities through it and hands back serializable views.

use serde::Serialize;

pub mod authentication;
pub mod episodes;
pub mod playlist;
pub mod podcasts;
pub mod utilities;

/// One page of a longer list. Pages are numbered from 1.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Cuts page `page` out of `items`. Page 0 is read as page 1, and a page
    /// past the end is empty.
    pub fn of(items: Vec<T>, page: usize, per_page: usize) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let total_items = items.len();
        let total_pages = ((total_items + per_page - 1) / per_page).max(1);

        let items = items
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();

        Page {
            page,
            total_pages,
            total_items,
            items,
        }
    }
}
