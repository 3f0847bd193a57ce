use log::{debug, warn};
use serde::Serialize;

use crate::cache::ViewCache;
use crate::config::{DashboardConfig, MapStyle};
use crate::data::filter::{FilterSpec, FilteredView, Range};
use crate::data::model::{Attribute, CategoricalAttr, Dataset, Listing, NumericAttr};
use crate::engine::aggregate::{
    self, CategoryCounts, GroupedHistogram, Histogram, MultiSeries, PivotTable, Scatter,
};
use crate::engine::geo::{self, GeoProjection};
use crate::engine::lookup::{self, SinglePoint};
use crate::engine::{self, search, AggregateRequest, AggregateResult};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Page payloads
// ---------------------------------------------------------------------------

/// Bounds for a range slider plus the current selection, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeControl {
    pub min: f64,
    pub max: f64,
    pub selected: Option<(f64, f64)>,
}

/// Options for each sidebar control. Each control's options come from the
/// view filtered by the controls before it; a `None` range means the
/// control cannot be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterControls {
    pub countries: Vec<String>,
    pub property_types: Vec<String>,
    pub room_types: Vec<String>,
    pub price: Option<RangeControl>,
    pub reviews: Option<RangeControl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingSummary {
    pub name: String,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingDetail {
    pub listing: Listing,
    pub radar: SinglePoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorationPage {
    pub listing_count: usize,
    pub listings: Vec<ListingSummary>,
    /// `None` when the selected name is not in the view.
    pub detail: Option<ListingDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisPage {
    pub listing_count: usize,
    pub room_types: CategoryCounts,
    pub price_heatmap: PivotTable,
    pub price_by_property_type: GroupedHistogram,
    pub review_scores: Histogram,
    pub price_vs_reviews: Scatter,
    pub price_vs_review_scores: Scatter,
    pub cancellation_policies: CategoryCounts,
    pub availability: MultiSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPage {
    pub listing_count: usize,
    pub style: MapStyle,
    pub zoom: f64,
    pub pitch: f64,
    pub projection: GeoProjection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub term: String,
    pub listing_count: usize,
    pub listings: Vec<Listing>,
}

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// Session state, independent of rendering.
pub struct DashboardState {
    /// Loaded listings (empty if the source was unavailable). Only
    /// replaced through `set_dataset` so `visible_indices` stays in bounds.
    dataset: Dataset,

    pub config: DashboardConfig,

    /// Current filter selections.
    pub filters: FilterSpec,

    /// Indices of listings passing the current filters.
    visible_indices: Vec<usize>,

    /// Status message for the UI, e.g. why nothing is shown.
    pub status_message: Option<String>,

    cache: ViewCache,
}

impl DashboardState {
    pub fn new(dataset: Dataset, config: DashboardConfig) -> Self {
        let mut state = DashboardState {
            visible_indices: Vec::new(),
            cache: ViewCache::new(config.cache.capacity),
            dataset,
            config,
            filters: FilterSpec::new(),
            status_message: None,
        };
        state.refilter();
        state
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.visible_indices
    }

    /// Swap in a newly loaded dataset and clear the filters.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.filters = FilterSpec::new();
        self.cache.clear();
        self.refilter();
    }

    pub fn set_filters(&mut self, filters: FilterSpec) {
        self.filters = filters;
        self.refilter();
    }

    /// Recompute `visible_indices` after a filter change.
    pub fn refilter(&mut self) {
        let view = self.cache.view(&self.dataset, &self.filters);
        debug!(
            "Filters matched {} of {} listings",
            view.len(),
            self.dataset.len()
        );
        self.status_message = if self.dataset.is_empty() {
            Some("No listing data available.".to_string())
        } else if view.is_empty() {
            Some("No listings available for the selected filters.".to_string())
        } else {
            None
        };
        self.visible_indices = view.into_indices();
    }

    /// The current filtered view.
    pub fn view(&self) -> FilteredView<'_> {
        FilteredView::new(&self.dataset, self.visible_indices.clone())
    }

    /// Cascading sidebar options: country, property type, room type, price,
    /// reviews.
    pub fn controls(&self) -> FilterControls {
        let mut scope = self.dataset.all();

        let countries = scope.distinct_values(CategoricalAttr::Country);
        scope = self.narrow(&scope, Attribute::Categorical(CategoricalAttr::Country));
        let property_types = scope.distinct_values(CategoricalAttr::PropertyType);
        scope = self.narrow(&scope, Attribute::Categorical(CategoricalAttr::PropertyType));
        let room_types = scope.distinct_values(CategoricalAttr::RoomType);
        scope = self.narrow(&scope, Attribute::Categorical(CategoricalAttr::RoomType));
        let price = self.range_control(&scope, NumericAttr::Price);
        scope = self.narrow(&scope, Attribute::Numeric(NumericAttr::Price));
        let reviews = self.range_control(&scope, NumericAttr::NumberOfReviews);

        FilterControls {
            countries,
            property_types,
            room_types,
            price,
            reviews,
        }
    }

    fn narrow<'a>(&self, scope: &FilteredView<'a>, attr: Attribute) -> FilteredView<'a> {
        scope.refine(&self.filters.restricted_to(attr))
    }

    /// Slider bounds widened to whole numbers so the defaults keep every
    /// listing in scope.
    fn range_control(&self, scope: &FilteredView<'_>, attr: NumericAttr) -> Option<RangeControl> {
        match scope.numeric_range(attr) {
            Ok((min, max)) => Some(RangeControl {
                min: min.floor(),
                max: max.ceil(),
                selected: self.filters.range(attr).map(|Range { min, max }| (min, max)),
            }),
            Err(err) => {
                warn!("Hiding {attr} control: {err}");
                None
            }
        }
    }

    pub fn exploration(&self, selected: Option<&str>) -> ExplorationPage {
        let view = self.view();
        let listings = view
            .iter()
            .map(|l| ListingSummary {
                name: l.name.clone(),
                price: l.numeric(NumericAttr::Price),
            })
            .collect();

        let selected = selected.or_else(|| view.iter().next().map(|l| l.name.as_str()));
        let detail = selected.and_then(|name| match lookup::find_by_name(&view, name) {
            Ok(listing) => Some(ListingDetail {
                listing: listing.clone(),
                radar: lookup::radar_profile(listing),
            }),
            Err(err) => {
                debug!("{err}");
                None
            }
        });

        ExplorationPage {
            listing_count: view.len(),
            listings,
            detail,
        }
    }

    pub fn analysis(&self) -> AnalysisPage {
        let view = self.view();
        let charts = &self.config.charts;
        AnalysisPage {
            listing_count: view.len(),
            room_types: aggregate::category_counts(&view, CategoricalAttr::RoomType),
            price_heatmap: aggregate::pivot_mean(
                &view,
                CategoricalAttr::PropertyType,
                CategoricalAttr::RoomType,
                NumericAttr::Price,
            ),
            price_by_property_type: aggregate::grouped_histogram(
                &view,
                NumericAttr::Price,
                CategoricalAttr::PropertyType,
                charts.price_bins,
            ),
            review_scores: aggregate::histogram(
                &view,
                NumericAttr::ReviewScoresRating,
                charts.review_score_bins,
            ),
            price_vs_reviews: aggregate::scatter_by_category(
                &view,
                NumericAttr::NumberOfReviews,
                NumericAttr::Price,
                CategoricalAttr::PropertyType,
                Some(NumericAttr::ReviewScoresRating),
            ),
            price_vs_review_scores: aggregate::scatter_by_category(
                &view,
                NumericAttr::ReviewScoresRating,
                NumericAttr::Price,
                CategoricalAttr::PropertyType,
                Some(NumericAttr::NumberOfReviews),
            ),
            cancellation_policies: aggregate::ranked_category_bar(
                &view,
                CategoricalAttr::CancellationPolicy,
            ),
            availability: aggregate::multi_series_count(&view, &charts.availability),
        }
    }

    /// Fails with `EmptyView` when there is nothing to center the map on.
    pub fn map(&self) -> Result<MapPage> {
        let view = self.view();
        let map = &self.config.map;
        let projection = geo::project(&view, map)?;
        Ok(MapPage {
            listing_count: view.len(),
            style: map.style,
            zoom: map.zoom,
            pitch: map.pitch,
            projection,
        })
    }

    /// Free-text search over the whole dataset, ignoring the filters.
    pub fn search(&self, term: &str) -> SearchPage {
        let results = search::search(&self.dataset.all(), term);
        SearchPage {
            term: term.to_string(),
            listing_count: results.len(),
            listings: results.iter().cloned().collect(),
        }
    }

    pub fn aggregate(&self, request: &AggregateRequest) -> Result<AggregateResult> {
        engine::evaluate(&self.view(), request, &self.config.map)
    }

    /// Whether an error should only be reported, not shown as a failure.
    pub fn is_expected(err: &DashboardError) -> bool {
        matches!(
            err,
            DashboardError::EmptyView
                | DashboardError::NotFound(_)
                | DashboardError::NoValidNumericData(_)
        )
    }
}
