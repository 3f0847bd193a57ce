use thiserror::Error;

use crate::data::model::NumericAttr;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every condition the engine reports. All of them are recoverable: callers
/// handle them where they occur and keep the session alive.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    /// The source could not be reached, timed out, or returned a table that
    /// violates the listing schema.
    #[error("listing data unavailable: {0}")]
    DataUnavailable(String),

    /// No record in scope carries a usable value for the attribute.
    #[error("no valid numeric data for `{0}`")]
    NoValidNumericData(NumericAttr),

    /// The view has zero records and the operation needs at least one.
    #[error("filtered view is empty")]
    EmptyView,

    /// Name lookup found nothing.
    #[error("no listing named `{0}`")]
    NotFound(String),

    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    #[error("invalid filter on `{attribute}`: {reason}")]
    InvalidFilter { attribute: String, reason: String },

    /// Two specs being merged constrain the same attribute.
    #[error("filters overlap on `{0}`")]
    OverlappingFilter(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
