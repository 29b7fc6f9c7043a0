use crate::schema::Marketplace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid ABC thresholds A={threshold_a}, B={threshold_b}: must satisfy 0 < A < B <= 100")]
    InvalidThresholds { threshold_a: f64, threshold_b: f64 },

    #[error("Unknown analysis metric '{0}': expected volume, revenue or profit")]
    UnknownMetric(String),

    #[error("Invalid parameter '{parameter}': {details}")]
    InvalidParameter { parameter: String, details: String },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AnalyticsError {
    /// Every variant except serialization failures is caused by caller input that
    /// has to be fixed before the call can succeed.
    pub fn is_invalid_parameter(&self) -> bool {
        !matches!(self, AnalyticsError::SerializationError(_))
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Non-fatal data issue found while building a statement. Collected and returned
/// next to the result instead of aborting the report.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum DataQualityWarning {
    #[error("Record {record_id}: category '{category}' is not in the taxonomy for {marketplace}; counted as indirect")]
    UnknownCategory {
        record_id: String,
        marketplace: Marketplace,
        category: String,
    },

    #[error("Record {record_id}: '{category}' has no marketplace; counted in other costs")]
    UnassignedMarketplace { record_id: String, category: String },

    #[error("Record {record_id}: expense without a category")]
    UncategorizedExpense { record_id: String },

    #[error("Marketplace {marketplace} is not described by the cost taxonomy")]
    UnknownMarketplace { marketplace: Marketplace },

    #[error("Record {record_id}: revenue without a marketplace")]
    UnassignedRevenue { record_id: String },

    #[error("Record {record_id}: investment expense '{category}' is not modeled in cash flow; skipped")]
    InvestmentExpenseSkipped { record_id: String, category: String },
}
