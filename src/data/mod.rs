/// Data layer: listing schema, loading, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv  (or any ListingSource)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch with timeout → Dataset (empty on failure)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Listing>, version stamp
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec predicates (AND) → FilteredView of indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
