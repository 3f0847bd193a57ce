use log::debug;
use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::data::model::{Listing, NumericAttr};
use crate::error::{DashboardError, Result};

/// Axes of the detail radar chart.
pub const RADAR_ATTRIBUTES: [NumericAttr; 3] = [
    NumericAttr::Price,
    NumericAttr::NumberOfReviews,
    NumericAttr::ReviewScoresRating,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeValue {
    pub attribute: NumericAttr,
    pub value: Option<f64>,
}

/// Selected numeric attributes of one listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinglePoint {
    pub name: String,
    pub values: Vec<AttributeValue>,
}

impl SinglePoint {
    pub fn value(&self, attr: NumericAttr) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.attribute == attr)
            .and_then(|v| v.value)
    }
}

/// First listing in view order whose name equals `name` exactly.
///
/// Duplicate names are not an error; the first match wins.
pub fn find_by_name<'a>(view: &FilteredView<'a>, name: &str) -> Result<&'a Listing> {
    let mut matches = view.iter().filter(|l| l.name == name);
    let first = matches
        .next()
        .ok_or_else(|| DashboardError::NotFound(name.to_string()))?;
    if matches.next().is_some() {
        debug!("Several listings named {name:?}; using the first");
    }
    Ok(first)
}

/// Every listing named `name`, in view order.
pub fn find_all_by_name<'a>(view: &FilteredView<'a>, name: &str) -> Vec<&'a Listing> {
    view.iter().filter(|l| l.name == name).collect()
}

pub fn single_point(listing: &Listing, attrs: &[NumericAttr]) -> SinglePoint {
    SinglePoint {
        name: listing.name.clone(),
        values: attrs
            .iter()
            .map(|&attribute| AttributeValue {
                attribute,
                value: listing.numeric(attribute),
            })
            .collect(),
    }
}

pub fn radar_profile(listing: &Listing) -> SinglePoint {
    single_point(listing, &RADAR_ATTRIBUTES)
}
