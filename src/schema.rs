use crate::error::{AnalyticsError, Result};
use crate::utils::parse_period_string;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket label used whenever a grouping or statement dimension is missing.
pub const UNASSIGNED: &str = "unassigned";

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
pub enum Marketplace {
    #[serde(rename = "WB")]
    #[schemars(description = "Wildberries")]
    Wb,

    #[serde(rename = "OZON")]
    #[schemars(description = "Ozon")]
    Ozon,

    #[serde(rename = "other")]
    #[schemars(description = "Any other sales channel (own site, offline, smaller marketplaces)")]
    Other,
}

impl Marketplace {
    pub fn label(&self) -> &'static str {
        match self {
            Marketplace::Wb => "WB",
            Marketplace::Ozon => "OZON",
            Marketplace::Other => "other",
        }
    }

    /// Parses a collaborator-supplied marketplace tag. Blank tags mean the record is
    /// not attributed to any marketplace.
    pub fn parse_tag(tag: Option<&str>) -> Option<Marketplace> {
        let tag = tag?.trim();
        if tag.is_empty() {
            return None;
        }

        Some(Marketplace::from(tag))
    }
}

impl From<&str> for Marketplace {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "wb" | "wildberries" | "вб" | "вайлдберриз" => Marketplace::Wb,
            "ozon" | "озон" => Marketplace::Ozon,
            _ => Marketplace::Other,
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn marketplace_label(marketplace: Option<Marketplace>) -> &'static str {
    marketplace.map(|m| m.label()).unwrap_or(UNASSIGNED)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Sale,
    Expense,
    PaymentIncome,
    PaymentExpense,
    CostOfGoods,
}

impl RecordKind {
    pub fn is_payment(&self) -> bool {
        matches!(self, RecordKind::PaymentIncome | RecordKind::PaymentExpense)
    }
}

/// Serializes as its snake_case name. Deserialization goes through [`FromStr`], so
/// config files accept the same aliases as string selectors.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMetric {
    #[schemars(description = "Number of units sold")]
    Volume,

    #[default]
    #[schemars(description = "Money amount of the record (revenue for sales)")]
    Revenue,

    #[schemars(description = "Profit attributed to the record")]
    Profit,
}

impl FromStr for AnalysisMetric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "volume" | "sales_volume" | "quantity" | "sales" => Ok(AnalysisMetric::Volume),
            "revenue" | "amount" => Ok(AnalysisMetric::Revenue),
            "profit" => Ok(AnalysisMetric::Profit),
            _ => Err(AnalyticsError::UnknownMetric(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for AnalysisMetric {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

impl fmt::Display for AnalysisMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisMetric::Volume => "volume",
            AnalysisMetric::Revenue => "revenue",
            AnalysisMetric::Profit => "profit",
        };
        f.write_str(name)
    }
}

/// The normalized unit both engines operate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialRecord {
    pub id: String,
    pub date: NaiveDate,
    pub marketplace: Option<Marketplace>,
    pub category: Option<String>,
    pub kind: RecordKind,
    /// Units sold. Zero for non-sale records.
    pub quantity: f64,
    /// Unsigned money amount; `kind` decides the sign in aggregation.
    pub amount: f64,
    pub profit: f64,
}

impl FinancialRecord {
    pub fn metric_value(&self, metric: AnalysisMetric) -> f64 {
        match metric {
            AnalysisMetric::Volume => self.quantity,
            AnalysisMetric::Revenue => self.amount,
            AnalysisMetric::Profit => self.profit,
        }
    }

    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNASSIGNED)
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(AnalyticsError::InvalidParameter {
                parameter: "period".to_string(),
                details: format!("end date {} is before start date {}", end, start),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses "YYYY-MM" or "YYYY-MM:YYYY-MM" into whole calendar months.
    pub fn parse(period: &str) -> Result<Self> {
        let (start, end) = parse_period_string(period)?;
        Self::new(start, end)
    }

    /// A range wide enough to accept any record.
    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
