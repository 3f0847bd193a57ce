/// Derived views over a [`FilteredView`]: aggregations, entity lookup, map
/// projection, and free-text search.
///
/// [`evaluate`] is the presentation boundary: it takes a request naming the
/// summary wanted and returns plain data with no rendering fields.
pub mod aggregate;
pub mod geo;
pub mod lookup;
pub mod search;

use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::data::filter::FilteredView;
use crate::data::model::{CategoricalAttr, NumericAttr};
use crate::error::Result;

use aggregate::{CategoryCounts, GroupedHistogram, Histogram, MultiSeries, PivotTable, Scatter};
use geo::GeoProjection;
use lookup::SinglePoint;

/// Which summary to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateRequest {
    CategoryCounts {
        attribute: CategoricalAttr,
    },
    RankedCategoryBar {
        attribute: CategoricalAttr,
    },
    PivotMean {
        row: CategoricalAttr,
        column: CategoricalAttr,
        value: NumericAttr,
    },
    Histogram {
        attribute: NumericAttr,
        bins: usize,
    },
    GroupedHistogram {
        attribute: NumericAttr,
        group_by: CategoricalAttr,
        bins: usize,
    },
    MultiSeriesCount {
        attributes: Vec<NumericAttr>,
    },
    Scatter {
        x: NumericAttr,
        y: NumericAttr,
        color_by: CategoricalAttr,
        #[serde(default)]
        size_by: Option<NumericAttr>,
    },
    Detail {
        name: String,
        #[serde(default)]
        attributes: Option<Vec<NumericAttr>>,
    },
    Geo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateResult {
    CategoryCounts(CategoryCounts),
    PivotTable(PivotTable),
    Histogram(Histogram),
    GroupedHistogram(GroupedHistogram),
    MultiSeries(MultiSeries),
    Scatter(Scatter),
    SinglePoint(SinglePoint),
    Geo(GeoProjection),
}

/// Compute one summary of `view`.
///
/// Aggregations never fail; `Detail` can fail with `NotFound` and `Geo` with
/// `EmptyView` or `NoValidNumericData`.
pub fn evaluate(
    view: &FilteredView<'_>,
    request: &AggregateRequest,
    map: &MapConfig,
) -> Result<AggregateResult> {
    let result = match request {
        AggregateRequest::CategoryCounts { attribute } => {
            AggregateResult::CategoryCounts(aggregate::category_counts(view, *attribute))
        }
        AggregateRequest::RankedCategoryBar { attribute } => {
            AggregateResult::CategoryCounts(aggregate::ranked_category_bar(view, *attribute))
        }
        AggregateRequest::PivotMean { row, column, value } => {
            AggregateResult::PivotTable(aggregate::pivot_mean(view, *row, *column, *value))
        }
        AggregateRequest::Histogram { attribute, bins } => {
            AggregateResult::Histogram(aggregate::histogram(view, *attribute, *bins))
        }
        AggregateRequest::GroupedHistogram {
            attribute,
            group_by,
            bins,
        } => AggregateResult::GroupedHistogram(aggregate::grouped_histogram(
            view, *attribute, *group_by, *bins,
        )),
        AggregateRequest::MultiSeriesCount { attributes } => {
            AggregateResult::MultiSeries(aggregate::multi_series_count(view, attributes))
        }
        AggregateRequest::Scatter {
            x,
            y,
            color_by,
            size_by,
        } => AggregateResult::Scatter(aggregate::scatter_by_category(
            view, *x, *y, *color_by, *size_by,
        )),
        AggregateRequest::Detail { name, attributes } => {
            let listing = lookup::find_by_name(view, name)?;
            let point = match attributes {
                Some(attrs) => lookup::single_point(listing, attrs),
                None => lookup::radar_profile(listing),
            };
            AggregateResult::SinglePoint(point)
        }
        AggregateRequest::Geo => AggregateResult::Geo(geo::project(view, map)?),
    };
    Ok(result)
}
