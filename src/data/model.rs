use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::data::filter::FilteredView;
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Attribute schema
// ---------------------------------------------------------------------------

/// Numeric listing columns. Values may be missing or invalid per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NumericAttr {
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "number_of_reviews")]
    NumberOfReviews,
    #[serde(rename = "review_scores_rating")]
    ReviewScoresRating,
    #[serde(rename = "latitude")]
    Latitude,
    #[serde(rename = "longitude")]
    Longitude,
    #[serde(rename = "availability_30")]
    Availability30,
    #[serde(rename = "availability_60")]
    Availability60,
    #[serde(rename = "availability_90")]
    Availability90,
    #[serde(rename = "availability_365")]
    Availability365,
}

impl NumericAttr {
    pub const ALL: [NumericAttr; 9] = [
        NumericAttr::Price,
        NumericAttr::NumberOfReviews,
        NumericAttr::ReviewScoresRating,
        NumericAttr::Latitude,
        NumericAttr::Longitude,
        NumericAttr::Availability30,
        NumericAttr::Availability60,
        NumericAttr::Availability90,
        NumericAttr::Availability365,
    ];

    /// Column name as it appears in the source table.
    pub fn as_str(self) -> &'static str {
        match self {
            NumericAttr::Price => "price",
            NumericAttr::NumberOfReviews => "number_of_reviews",
            NumericAttr::ReviewScoresRating => "review_scores_rating",
            NumericAttr::Latitude => "latitude",
            NumericAttr::Longitude => "longitude",
            NumericAttr::Availability30 => "availability_30",
            NumericAttr::Availability60 => "availability_60",
            NumericAttr::Availability90 => "availability_90",
            NumericAttr::Availability365 => "availability_365",
        }
    }
}

/// Categorical listing columns. Values are opaque strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalAttr {
    Country,
    PropertyType,
    RoomType,
    CancellationPolicy,
}

impl CategoricalAttr {
    pub const ALL: [CategoricalAttr; 4] = [
        CategoricalAttr::Country,
        CategoricalAttr::PropertyType,
        CategoricalAttr::RoomType,
        CategoricalAttr::CancellationPolicy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoricalAttr::Country => "country",
            CategoricalAttr::PropertyType => "property_type",
            CategoricalAttr::RoomType => "room_type",
            CategoricalAttr::CancellationPolicy => "cancellation_policy",
        }
    }
}

/// Any filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Numeric(NumericAttr),
    Categorical(CategoricalAttr),
}

impl Attribute {
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Numeric(a) => a.as_str(),
            Attribute::Categorical(a) => a.as_str(),
        }
    }
}

impl FromStr for NumericAttr {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        NumericAttr::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DashboardError::UnknownAttribute(s.to_string()))
    }
}

impl FromStr for CategoricalAttr {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        CategoricalAttr::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DashboardError::UnknownAttribute(s.to_string()))
    }
}

impl FromStr for Attribute {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<NumericAttr>()
            .map(Attribute::Numeric)
            .or_else(|_| s.parse::<CategoricalAttr>().map(Attribute::Categorical))
    }
}

impl fmt::Display for NumericAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CategoricalAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Listing – one row of the source table
// ---------------------------------------------------------------------------

/// A single rental listing.
///
/// Numeric fields hold whatever the source provided; [`Listing::numeric`] is
/// the only accessor the engine uses and it hides non-finite values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Listing {
    /// Display name. Not guaranteed unique.
    pub name: String,
    pub country: String,
    pub property_type: String,
    pub room_type: String,
    pub cancellation_policy: String,
    pub price: Option<f64>,
    pub number_of_reviews: Option<f64>,
    pub review_scores_rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub availability_30: Option<f64>,
    pub availability_60: Option<f64>,
    pub availability_90: Option<f64>,
    pub availability_365: Option<f64>,
}

impl Listing {
    /// A listing with the given name and every other column missing.
    pub fn named(name: impl Into<String>) -> Self {
        Listing {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Valid (present and finite) value of a numeric column.
    pub fn numeric(&self, attr: NumericAttr) -> Option<f64> {
        let raw = match attr {
            NumericAttr::Price => self.price,
            NumericAttr::NumberOfReviews => self.number_of_reviews,
            NumericAttr::ReviewScoresRating => self.review_scores_rating,
            NumericAttr::Latitude => self.latitude,
            NumericAttr::Longitude => self.longitude,
            NumericAttr::Availability30 => self.availability_30,
            NumericAttr::Availability60 => self.availability_60,
            NumericAttr::Availability90 => self.availability_90,
            NumericAttr::Availability365 => self.availability_365,
        };
        raw.filter(|v| v.is_finite())
    }

    pub fn categorical(&self, attr: CategoricalAttr) -> &str {
        match attr {
            CategoricalAttr::Country => &self.country,
            CategoricalAttr::PropertyType => &self.property_type,
            CategoricalAttr::RoomType => &self.room_type,
            CategoricalAttr::CancellationPolicy => &self.cancellation_policy,
        }
    }

    pub fn set_numeric(&mut self, attr: NumericAttr, value: Option<f64>) {
        let slot = match attr {
            NumericAttr::Price => &mut self.price,
            NumericAttr::NumberOfReviews => &mut self.number_of_reviews,
            NumericAttr::ReviewScoresRating => &mut self.review_scores_rating,
            NumericAttr::Latitude => &mut self.latitude,
            NumericAttr::Longitude => &mut self.longitude,
            NumericAttr::Availability30 => &mut self.availability_30,
            NumericAttr::Availability60 => &mut self.availability_60,
            NumericAttr::Availability90 => &mut self.availability_90,
            NumericAttr::Availability365 => &mut self.availability_365,
        };
        *slot = value;
    }

    pub fn set_categorical(&mut self, attr: CategoricalAttr, value: impl Into<String>) {
        let slot = match attr {
            CategoricalAttr::Country => &mut self.country,
            CategoricalAttr::PropertyType => &mut self.property_type,
            CategoricalAttr::RoomType => &mut self.room_type,
            CategoricalAttr::CancellationPolicy => &mut self.cancellation_policy,
        };
        *slot = value.into();
    }

    /// Builder form of [`Listing::set_numeric`].
    pub fn with_numeric(mut self, attr: NumericAttr, value: f64) -> Self {
        self.set_numeric(attr, Some(value));
        self
    }

    /// Builder form of [`Listing::set_categorical`].
    pub fn with_category(mut self, attr: CategoricalAttr, value: impl Into<String>) -> Self {
        self.set_categorical(attr, value);
        self
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Identity of one loaded dataset snapshot, used to key cached views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DatasetVersion(pub u64);

/// The immutable listings table for one session.
#[derive(Debug, Clone)]
pub struct Dataset {
    listings: Vec<Listing>,
    version: DatasetVersion,
}

impl Dataset {
    pub fn new(listings: Vec<Listing>) -> Self {
        Dataset {
            listings,
            version: DatasetVersion(NEXT_VERSION.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// The degraded state used when the source is unavailable.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn version(&self) -> DatasetVersion {
        self.version
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn get(&self, index: usize) -> Option<&Listing> {
        self.listings.get(index)
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Unfiltered view over every listing.
    pub fn all(&self) -> FilteredView<'_> {
        FilteredView::new(self, (0..self.listings.len()).collect())
    }

    /// Distinct values of a categorical column in first-seen order.
    pub fn distinct_values(&self, attr: CategoricalAttr) -> Vec<String> {
        self.all().distinct_values(attr)
    }

    /// `(min, max)` of a numeric column, ignoring invalid values.
    pub fn numeric_range(&self, attr: NumericAttr) -> Result<(f64, f64)> {
        self.all().numeric_range(attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Listing::named("a")
                .with_category(CategoricalAttr::Country, "Spain")
                .with_numeric(NumericAttr::Price, 80.0),
            Listing::named("b")
                .with_category(CategoricalAttr::Country, "Portugal")
                .with_numeric(NumericAttr::Price, f64::NAN),
            Listing::named("c")
                .with_category(CategoricalAttr::Country, "Spain")
                .with_numeric(NumericAttr::Price, 25.0),
        ])
    }

    #[test]
    fn test_attribute_parsing() {
        assert_eq!(
            "availability_365".parse::<Attribute>().unwrap(),
            Attribute::Numeric(NumericAttr::Availability365)
        );
        assert_eq!(
            "room_type".parse::<Attribute>().unwrap(),
            Attribute::Categorical(CategoricalAttr::RoomType)
        );
        assert_eq!(
            "amenities".parse::<Attribute>(),
            Err(DashboardError::UnknownAttribute("amenities".to_string()))
        );
    }

    #[test]
    fn test_non_finite_values_are_invalid() {
        let ds = sample();
        assert_eq!(ds.listings()[0].numeric(NumericAttr::Price), Some(80.0));
        assert_eq!(ds.listings()[1].numeric(NumericAttr::Price), None);
        assert_eq!(ds.listings()[1].numeric(NumericAttr::Latitude), None);
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let ds = sample();
        assert_eq!(
            ds.distinct_values(CategoricalAttr::Country),
            vec!["Spain".to_string(), "Portugal".to_string()]
        );
    }

    #[test]
    fn test_numeric_range_skips_invalid() {
        let ds = sample();
        assert_eq!(ds.numeric_range(NumericAttr::Price).unwrap(), (25.0, 80.0));
        assert_eq!(
            ds.numeric_range(NumericAttr::ReviewScoresRating),
            Err(DashboardError::NoValidNumericData(NumericAttr::ReviewScoresRating))
        );
    }

    #[test]
    fn test_empty_dataset_is_valid() {
        let ds = Dataset::empty();
        assert!(ds.is_empty());
        assert!(ds.distinct_values(CategoricalAttr::RoomType).is_empty());
        assert!(ds.all().is_empty());
    }

    #[test]
    fn test_versions_are_unique() {
        assert_ne!(Dataset::empty().version(), Dataset::empty().version());
    }
}
