//! Error types shared by the mining, hierarchy and planning stages.

use thiserror::Error;

/// Coarse classification of a [`PlannerError`], for callers deciding whether to
/// retry with relaxed thresholds or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameter,
    EmptyDataset,
    UndefinedRisk,
    Collaborator,
    UnmappedValue,
}

#[derive(Debug, Error)]
pub enum PlannerError {
    /// A threshold or argument is outside its allowed range. Raised before any query.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The base predicate matches no rows.
    #[error("Dataset is empty under the base predicate")]
    EmptyDataset,

    /// An itemset covers every outlier, so the out-of-itemset outlier rate is zero.
    #[error("Risk ratio undefined for itemset {values:?}: it covers all {outliers} outliers")]
    UndefinedRisk { values: Vec<String>, outliers: u64 },

    /// An aggregate query or mutation against the row store failed.
    #[error("Row store {operation} failed: {message}")]
    Collaborator { operation: &'static str, message: String },

    /// An explanation value is not a distinct value of any configured attribute.
    #[error("Value `{0}` does not belong to any configured attribute")]
    UnmappedValue(String),
}

impl PlannerError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name, reason: reason.into() }
    }

    pub fn collaborator(operation: &'static str, message: impl ToString) -> Self {
        Self::Collaborator { operation, message: message.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::EmptyDataset => ErrorKind::EmptyDataset,
            Self::UndefinedRisk { .. } => ErrorKind::UndefinedRisk,
            Self::Collaborator { .. } => ErrorKind::Collaborator,
            Self::UnmappedValue(_) => ErrorKind::UnmappedValue,
        }
    }

    /// True for errors that a caller can sensibly answer by re-running with
    /// different thresholds or a wider base predicate.
    pub fn is_retryable_with_relaxed_thresholds(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidParameter | ErrorKind::EmptyDataset)
    }
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
