use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::model::{Attribute, CategoricalAttr, Dataset, Listing, NumericAttr};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Range { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

// -- Bit-pattern Eq/Hash so a spec can key a cache --

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.min.to_bits() == other.min.to_bits() && self.max.to_bits() == other.max.to_bits()
    }
}

impl Eq for Range {}

impl Hash for Range {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.min.to_bits().hash(state);
        self.max.to_bits().hash(state);
    }
}

/// Untyped predicate as it arrives from a config file or the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPredicate {
    Range { min: f64, max: f64 },
    Values(Vec<String>),
}

// ---------------------------------------------------------------------------
// FilterSpec
// ---------------------------------------------------------------------------

/// Declarative set of per-attribute predicates, combined with AND.
///
/// Each attribute appears at most once; numeric attributes can only carry a
/// range and categorical attributes can only carry a value set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, RawPredicate>",
    into = "BTreeMap<String, RawPredicate>"
)]
pub struct FilterSpec {
    ranges: BTreeMap<NumericAttr, Range>,
    sets: BTreeMap<CategoricalAttr, BTreeSet<String>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain `attr` to `[min, max]`, replacing any previous range.
    pub fn with_range(mut self, attr: NumericAttr, min: f64, max: f64) -> Self {
        self.ranges.insert(attr, Range::new(min, max));
        self
    }

    /// Constrain `attr` to the given values, replacing any previous set.
    pub fn with_values<I, S>(mut self, attr: CategoricalAttr, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sets
            .insert(attr, values.into_iter().map(Into::into).collect());
        self
    }

    /// Validated insertion by column name.
    pub fn insert(&mut self, name: &str, predicate: RawPredicate) -> Result<()> {
        let invalid = |reason: &str| DashboardError::InvalidFilter {
            attribute: name.to_string(),
            reason: reason.to_string(),
        };
        match (name.parse::<Attribute>()?, predicate) {
            (Attribute::Numeric(attr), RawPredicate::Range { min, max }) => {
                if min.is_nan() || max.is_nan() {
                    return Err(invalid("range bounds must be numbers"));
                }
                self.ranges.insert(attr, Range::new(min, max));
            }
            (Attribute::Categorical(attr), RawPredicate::Values(values)) => {
                self.sets.insert(attr, values.into_iter().collect());
            }
            (Attribute::Numeric(_), RawPredicate::Values(_)) => {
                return Err(invalid("numeric attributes take a {min, max} range"));
            }
            (Attribute::Categorical(_), RawPredicate::Range { .. }) => {
                return Err(invalid("categorical attributes take a list of values"));
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, attr: Attribute) {
        match attr {
            Attribute::Numeric(a) => {
                self.ranges.remove(&a);
            }
            Attribute::Categorical(a) => {
                self.sets.remove(&a);
            }
        }
    }

    pub fn range(&self, attr: NumericAttr) -> Option<Range> {
        self.ranges.get(&attr).copied()
    }

    pub fn values(&self, attr: CategoricalAttr) -> Option<&BTreeSet<String>> {
        self.sets.get(&attr)
    }

    pub fn len(&self) -> usize {
        self.ranges.len() + self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.sets.is_empty()
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        self.ranges
            .keys()
            .map(|a| Attribute::Numeric(*a))
            .chain(self.sets.keys().map(|a| Attribute::Categorical(*a)))
            .collect()
    }

    /// The part of this spec that constrains `attr` (possibly empty).
    pub fn restricted_to(&self, attr: Attribute) -> FilterSpec {
        let mut only = FilterSpec::new();
        match attr {
            Attribute::Numeric(a) => {
                if let Some(range) = self.range(a) {
                    only.ranges.insert(a, range);
                }
            }
            Attribute::Categorical(a) => {
                if let Some(values) = self.values(a) {
                    only.sets.insert(a, values.clone());
                }
            }
        }
        only
    }

    /// Union of two specs over disjoint attributes.
    pub fn merge(&self, other: &FilterSpec) -> Result<FilterSpec> {
        let mut merged = self.clone();
        for (attr, range) in &other.ranges {
            if merged.ranges.insert(*attr, *range).is_some() {
                return Err(DashboardError::OverlappingFilter(attr.to_string()));
            }
        }
        for (attr, values) in &other.sets {
            if merged.sets.insert(*attr, values.clone()).is_some() {
                return Err(DashboardError::OverlappingFilter(attr.to_string()));
            }
        }
        Ok(merged)
    }

    /// Whether a listing passes every predicate.
    ///
    /// * Range: the value must be valid and inside the bounds
    /// * Value set: exact, case-sensitive membership; an empty set rejects all
    pub fn matches(&self, listing: &Listing) -> bool {
        let ranges_pass = self.ranges.iter().all(|(attr, range)| {
            listing
                .numeric(*attr)
                .is_some_and(|value| range.contains(value))
        });
        ranges_pass
            && self
                .sets
                .iter()
                .all(|(attr, allowed)| allowed.contains(listing.categorical(*attr)))
    }
}

impl TryFrom<BTreeMap<String, RawPredicate>> for FilterSpec {
    type Error = DashboardError;

    fn try_from(raw: BTreeMap<String, RawPredicate>) -> Result<Self> {
        let mut spec = FilterSpec::new();
        for (name, predicate) in raw {
            spec.insert(&name, predicate)?;
        }
        Ok(spec)
    }
}

impl From<FilterSpec> for BTreeMap<String, RawPredicate> {
    fn from(spec: FilterSpec) -> Self {
        let ranges = spec.ranges.into_iter().map(|(attr, r)| {
            (
                attr.as_str().to_string(),
                RawPredicate::Range { min: r.min, max: r.max },
            )
        });
        let sets = spec.sets.into_iter().map(|(attr, values)| {
            (
                attr.as_str().to_string(),
                RawPredicate::Values(values.into_iter().collect()),
            )
        });
        ranges.chain(sets).collect()
    }
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// Read-only projection of a [`Dataset`] by row index, in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub(crate) fn new(dataset: &'a Dataset, indices: Vec<usize>) -> Self {
        FilteredView { dataset, indices }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Dataset row indices of the records in this view.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn into_indices(self) -> Vec<usize> {
        self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Listing> + '_ {
        let listings = self.dataset.listings();
        self.indices.iter().map(move |&i| &listings[i])
    }

    /// Narrow this view further.
    pub fn refine(&self, spec: &FilterSpec) -> FilteredView<'a> {
        let listings = self.dataset.listings();
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| spec.matches(&listings[i]))
            .collect();
        FilteredView::new(self.dataset, indices)
    }

    /// Valid values of a numeric column, in view order.
    pub fn valid_values(&self, attr: NumericAttr) -> impl Iterator<Item = f64> + '_ {
        self.iter().filter_map(move |l| l.numeric(attr))
    }

    /// Distinct values of a categorical column in first-seen order.
    pub fn distinct_values(&self, attr: CategoricalAttr) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        for listing in self.iter() {
            let value = listing.categorical(attr);
            if seen.insert(value) {
                ordered.push(value.to_string());
            }
        }
        ordered
    }

    /// `(min, max)` of a numeric column over valid values.
    pub fn numeric_range(&self, attr: NumericAttr) -> Result<(f64, f64)> {
        self.valid_values(attr)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .ok_or(DashboardError::NoValidNumericData(attr))
    }
}

impl PartialEq for FilteredView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.dataset, other.dataset) && self.indices == other.indices
    }
}

/// Return the view of `dataset` that passes every predicate in `spec`.
pub fn apply<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> FilteredView<'a> {
    let indices = dataset
        .listings()
        .iter()
        .enumerate()
        .filter(|(_, listing)| spec.matches(listing))
        .map(|(i, _)| i)
        .collect();
    FilteredView::new(dataset, indices)
}
