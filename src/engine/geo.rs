use serde::Serialize;

use crate::config::MapConfig;
use crate::data::filter::FilteredView;
use crate::data::model::{Listing, NumericAttr};
use crate::error::{DashboardError, Result};

/// One map marker with its tooltip fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Render radius in pixels, already clamped.
    pub radius: f64,
    pub name: String,
    pub price: Option<f64>,
    pub number_of_reviews: Option<f64>,
    pub review_scores_rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Centroid {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoProjection {
    pub points: Vec<GeoPoint>,
    pub centroid: Centroid,
}

/// `price / radius_divisor` clamped to the configured pixel range. A listing
/// without a price gets the minimum radius.
pub fn radius_for(price: Option<f64>, config: &MapConfig) -> f64 {
    price
        .map(|p| p / config.radius_divisor)
        .unwrap_or(config.min_radius_pixels)
        .clamp(config.min_radius_pixels, config.max_radius_pixels)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Mean latitude and mean longitude, each over the records where it is valid.
pub fn centroid(view: &FilteredView<'_>) -> Result<Centroid> {
    if view.is_empty() {
        return Err(DashboardError::EmptyView);
    }
    let latitude = mean(view.valid_values(NumericAttr::Latitude))
        .ok_or(DashboardError::NoValidNumericData(NumericAttr::Latitude))?;
    let longitude = mean(view.valid_values(NumericAttr::Longitude))
        .ok_or(DashboardError::NoValidNumericData(NumericAttr::Longitude))?;
    Ok(Centroid {
        latitude,
        longitude,
    })
}

fn to_point(listing: &Listing, config: &MapConfig) -> Option<GeoPoint> {
    let price = listing.numeric(NumericAttr::Price);
    Some(GeoPoint {
        latitude: listing.numeric(NumericAttr::Latitude)?,
        longitude: listing.numeric(NumericAttr::Longitude)?,
        radius: radius_for(price, config),
        name: listing.name.clone(),
        price,
        number_of_reviews: listing.numeric(NumericAttr::NumberOfReviews),
        review_scores_rating: listing.numeric(NumericAttr::ReviewScoresRating),
    })
}

/// Map markers for every listing with valid coordinates, plus the centroid
/// to anchor the map on. Fails with `EmptyView` on a view of zero records.
pub fn project(view: &FilteredView<'_>, config: &MapConfig) -> Result<GeoProjection> {
    let centroid = centroid(view)?;
    let points = view
        .iter()
        .filter_map(|listing| to_point(listing, config))
        .collect();
    Ok(GeoProjection { points, centroid })
}
