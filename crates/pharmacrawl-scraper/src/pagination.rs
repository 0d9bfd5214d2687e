//! Listing page addressing and the short-page stop rule.

use crate::types::Target;

/// URL of page `page_number` below a category root.
#[must_use]
pub fn listing_page_url(base_url: &str, page_number: u32, page_size: u32) -> String {
    format!(
        "{}/page-{page_number}/?items_per_page={page_size}&sort_by=product&sort_order=asc",
        base_url.trim_end_matches('/')
    )
}

/// The successor of a listing page that produced `records_on_page` records.
///
/// A page holding fewer records than the page size is the category's last
/// page, as is `last_page` itself. Direct lookups have no successor.
#[must_use]
pub fn next_page(target: &Target, records_on_page: usize) -> Option<Target> {
    let Target::ListingPage {
        base_url,
        page_number,
        page_size,
        site,
        last_page,
        category,
    } = target
    else {
        return None;
    };

    let full_page = usize::try_from(*page_size).is_ok_and(|size| records_on_page >= size);
    if !full_page || *page_number >= *last_page {
        return None;
    }

    Some(Target::ListingPage {
        base_url: base_url.clone(),
        page_number: page_number + 1,
        page_size: *page_size,
        site: *site,
        last_page: *last_page,
        category: category.clone(),
    })
}
