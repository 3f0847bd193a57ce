//! Filtering and aggregation engine behind a rental listings dashboard.
//!
//! The [`data`] layer loads an immutable [`Dataset`] and narrows it with a
//! [`FilterSpec`]; the [`engine`] turns the resulting [`FilteredView`] into
//! plain summaries for a charting layer; [`state`] wires both into the page
//! payloads a UI needs.

pub mod cache;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod state;

pub use config::DashboardConfig;
pub use data::filter::{apply, FilterSpec, FilteredView};
pub use data::model::{Attribute, CategoricalAttr, Dataset, Listing, NumericAttr};
pub use engine::{evaluate, AggregateRequest, AggregateResult};
pub use error::{DashboardError, Result};
pub use state::DashboardState;
