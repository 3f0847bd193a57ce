//! Summaries computed from a [`FilteredView`].
//!
//! Every function here is pure: identical views give identical results, and
//! an empty view gives an empty result rather than an error.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::data::model::{CategoricalAttr, NumericAttr};

// ---------------------------------------------------------------------------
// Category counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

/// Records per category, most frequent first; ties keep first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub attribute: CategoricalAttr,
    pub counts: Vec<CategoryCount>,
}

impl CategoryCounts {
    pub fn get(&self, value: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|c| c.value == value)
            .map(|c| c.count)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Count records per distinct value of `attr`. Values absent from the view
/// are absent from the result.
pub fn category_counts(view: &FilteredView<'_>, attr: CategoricalAttr) -> CategoryCounts {
    let mut position: BTreeMap<&str, usize> = BTreeMap::new();
    let mut counts: Vec<CategoryCount> = Vec::new();
    for listing in view.iter() {
        let value = listing.categorical(attr);
        match position.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                position.insert(value, counts.len());
                counts.push(CategoryCount {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    CategoryCounts {
        attribute: attr,
        counts,
    }
}

/// Bar-chart flavour of [`category_counts`]; the aggregation is the same.
pub fn ranked_category_bar(view: &FilteredView<'_>, attr: CategoricalAttr) -> CategoryCounts {
    category_counts(view, attr)
}

// ---------------------------------------------------------------------------
// Pivoted means
// ---------------------------------------------------------------------------

/// Mean of a numeric column per (row category, column category).
///
/// `cells[r][c]` is `None` where no record with a valid value contributes.
/// Rows and columns are sorted and only include categories with at least one
/// defined cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_attr: CategoricalAttr,
    pub col_attr: CategoricalAttr,
    pub value_attr: NumericAttr,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|v| v == row)?;
        let c = self.columns.iter().position(|v| v == column)?;
        self.cells[r][c]
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn pivot_mean(
    view: &FilteredView<'_>,
    row_attr: CategoricalAttr,
    col_attr: CategoricalAttr,
    value_attr: NumericAttr,
) -> PivotTable {
    let mut sums: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
    for listing in view.iter() {
        let Some(value) = listing.numeric(value_attr) else {
            continue;
        };
        let key = (listing.categorical(row_attr), listing.categorical(col_attr));
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let mut rows: Vec<String> = sums.keys().map(|(r, _)| r.to_string()).collect();
    rows.dedup();
    let mut columns: Vec<String> = sums.keys().map(|(_, c)| c.to_string()).collect();
    columns.sort();
    columns.dedup();

    let cells = rows
        .iter()
        .map(|r| {
            columns
                .iter()
                .map(|c| {
                    sums.get(&(r.as_str(), c.as_str()))
                        .map(|(sum, n)| sum / *n as f64)
                })
                .collect()
        })
        .collect();

    PivotTable {
        row_attr,
        col_attr,
        value_attr,
        rows,
        columns,
        cells,
    }
}

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

/// Equal-width bins over `[min, max]`; the last bin is closed on the right.
#[derive(Debug, Clone, Copy)]
struct Binning {
    min: f64,
    max: f64,
    bins: usize,
}

impl Binning {
    /// `None` when there is nothing to bin. A zero-width range collapses to a
    /// single bin.
    fn over(values: &[f64], bins: usize) -> Option<Binning> {
        if bins == 0 || values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bins = if max > min { bins } else { 1 };
        Some(Binning { min, max, bins })
    }

    /// `max - min`, or `None` when it overflows (finite values of opposite
    /// sign near `f64::MAX`).
    fn span(&self) -> Option<f64> {
        Some(self.max - self.min).filter(|s| s.is_finite())
    }

    fn edges(&self) -> Vec<f64> {
        let n = self.bins as f64;
        let mut edges: Vec<f64> = match self.span() {
            Some(span) => {
                let width = span / n;
                (0..self.bins).map(|i| self.min + i as f64 * width).collect()
            }
            // Convex combination stays within [min, max].
            None => (0..self.bins)
                .map(|i| {
                    let t = i as f64 / n;
                    self.min * (1.0 - t) + self.max * t
                })
                .collect(),
        };
        edges.push(self.max);
        edges
    }

    fn index(&self, value: f64) -> usize {
        if self.bins == 1 {
            return 0;
        }
        let fraction = match self.span() {
            Some(span) => (value - self.min) / span,
            None => (value / 2.0 - self.min / 2.0) / (self.max / 2.0 - self.min / 2.0),
        };
        ((fraction * self.bins as f64).floor() as usize).min(self.bins - 1)
    }
}

/// `edges.len() == counts.len() + 1` unless the histogram is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub attribute: NumericAttr,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Bin the valid values of `attr` into `bins` equal-width bins.
pub fn histogram(view: &FilteredView<'_>, attr: NumericAttr, bins: usize) -> Histogram {
    let values: Vec<f64> = view.valid_values(attr).collect();
    let Some(binning) = Binning::over(&values, bins) else {
        return Histogram {
            attribute: attr,
            edges: Vec::new(),
            counts: Vec::new(),
        };
    };
    let mut counts = vec![0; binning.bins];
    for v in values {
        counts[binning.index(v)] += 1;
    }
    Histogram {
        attribute: attr,
        edges: binning.edges(),
        counts,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramSeries {
    pub group: String,
    pub counts: Vec<usize>,
}

/// Histogram split by a category, all groups sharing one set of edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedHistogram {
    pub attribute: NumericAttr,
    pub group_by: CategoricalAttr,
    pub edges: Vec<f64>,
    pub groups: Vec<HistogramSeries>,
}

pub fn grouped_histogram(
    view: &FilteredView<'_>,
    attr: NumericAttr,
    group_by: CategoricalAttr,
    bins: usize,
) -> GroupedHistogram {
    let values: Vec<(&str, f64)> = view
        .iter()
        .filter_map(|l| l.numeric(attr).map(|v| (l.categorical(group_by), v)))
        .collect();
    let plain: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    let Some(binning) = Binning::over(&plain, bins) else {
        return GroupedHistogram {
            attribute: attr,
            group_by,
            edges: Vec::new(),
            groups: Vec::new(),
        };
    };

    let mut position: BTreeMap<&str, usize> = BTreeMap::new();
    let mut groups: Vec<HistogramSeries> = Vec::new();
    for (group, value) in values {
        let i = *position.entry(group).or_insert_with(|| {
            groups.push(HistogramSeries {
                group: group.to_string(),
                counts: vec![0; binning.bins],
            });
            groups.len() - 1
        });
        groups[i].counts[binning.index(value)] += 1;
    }

    GroupedHistogram {
        attribute: attr,
        group_by,
        edges: binning.edges(),
        groups,
    }
}

// ---------------------------------------------------------------------------
// Multi-series value counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub attribute: NumericAttr,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiSeries {
    pub series: Vec<Series>,
}

/// One series per attribute counting records per distinct raw value, x
/// ascending. Series do not share an x domain.
pub fn multi_series_count(view: &FilteredView<'_>, attrs: &[NumericAttr]) -> MultiSeries {
    let series = attrs
        .iter()
        .map(|&attr| {
            // `+ 0.0` folds -0.0 into 0.0 so both land on one point.
            let mut values: Vec<f64> = view.valid_values(attr).map(|v| v + 0.0).collect();
            values.sort_by(f64::total_cmp);
            let mut points: Vec<SeriesPoint> = Vec::new();
            for v in values {
                match points.last_mut() {
                    Some(last) if last.x == v => last.count += 1,
                    _ => points.push(SeriesPoint { x: v, count: 1 }),
                }
            }
            Series {
                attribute: attr,
                points,
            }
        })
        .collect();
    MultiSeries { series }
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub size: Option<f64>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterGroup {
    pub category: String,
    pub points: Vec<ScatterPoint>,
}

/// Points coloured by a category, optionally sized by a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter {
    pub x: NumericAttr,
    pub y: NumericAttr,
    pub color_by: CategoricalAttr,
    pub size_by: Option<NumericAttr>,
    pub groups: Vec<ScatterGroup>,
}

impl Scatter {
    pub fn point_count(&self) -> usize {
        self.groups.iter().map(|g| g.points.len()).sum()
    }
}

/// Records missing `x` or `y` are dropped; a missing size stays `None`.
pub fn scatter_by_category(
    view: &FilteredView<'_>,
    x: NumericAttr,
    y: NumericAttr,
    color_by: CategoricalAttr,
    size_by: Option<NumericAttr>,
) -> Scatter {
    let mut position: BTreeMap<&str, usize> = BTreeMap::new();
    let mut groups: Vec<ScatterGroup> = Vec::new();
    for listing in view.iter() {
        let (Some(xv), Some(yv)) = (listing.numeric(x), listing.numeric(y)) else {
            continue;
        };
        let category = listing.categorical(color_by);
        let i = *position.entry(category).or_insert_with(|| {
            groups.push(ScatterGroup {
                category: category.to_string(),
                points: Vec::new(),
            });
            groups.len() - 1
        });
        groups[i].points.push(ScatterPoint {
            x: xv,
            y: yv,
            size: size_by.and_then(|attr| listing.numeric(attr)),
            name: listing.name.clone(),
        });
    }
    Scatter {
        x,
        y,
        color_by,
        size_by,
        groups,
    }
}
