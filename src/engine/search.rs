use crate::data::filter::FilteredView;
use crate::data::model::{CategoricalAttr, Listing, NumericAttr};

/// Listings in `view` where any column's text contains `term`, ignoring case.
/// A blank term matches everything.
pub fn search<'a>(view: &FilteredView<'a>, term: &str) -> FilteredView<'a> {
    let needle = term.trim().to_lowercase();
    let listings = view.dataset().listings();
    let indices = view
        .indices()
        .iter()
        .copied()
        .filter(|&i| needle.is_empty() || listing_matches(&listings[i], &needle))
        .collect();
    FilteredView::new(view.dataset(), indices)
}

fn listing_matches(listing: &Listing, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);
    contains(&listing.name)
        || CategoricalAttr::ALL
            .into_iter()
            .any(|attr| contains(listing.categorical(attr)))
        || NumericAttr::ALL
            .into_iter()
            .filter_map(|attr| listing.numeric(attr))
            .any(|v| contains(&format!("{v:?}")))
}
