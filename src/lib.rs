//! # Marketplace Analytics
//!
//! The computational core of a seller analytics dashboard for marketplace
//! (Wildberries, Ozon, ...) accounts.
//!
//! ## Core Concepts
//!
//! - **Normalization**: sales, expenses, bank payments and cost-of-goods rows become
//!   one [`FinancialRecord`] shape
//! - **ABC classification**: records ranked by volume, revenue or profit and split
//!   into tiers A/B/C by cumulative share (80/95 by default)
//! - **Aggregation**: counts and sums grouped by tier, category, marketplace or month
//! - **Profit & Loss**: revenue, direct and indirect costs per marketplace driven by
//!   a caller-supplied [`CostTaxonomy`], then profit before tax and net profit
//! - **Cash Flow**: payments split into operational, investment and financial
//!   activities
//!
//! Everything is a pure function of its inputs. Data problems that should not stop
//! a report are returned as [`DataQualityWarning`]s.
//!
//! ## Example
//!
//! ```rust,ignore
//! use marketplace_analytics::*;
//!
//! let config = ReportConfig {
//!     period: Some("2024-01:2024-03".to_string()),
//!     ..ReportConfig::default()
//! };
//!
//! let rows: Vec<RawRecord> = serde_json::from_str(&json_from_collaborator)?;
//! let report = process_dashboard(&rows, &config)?;
//!
//! println!("{}", report.profit_and_loss.statement.to_markdown());
//! ```

pub mod aggregation;
pub mod cash_flow;
pub mod classifier;
pub mod error;
pub mod ingestion;
pub mod pnl;
pub mod schema;
pub mod statement;
pub mod taxonomy;
pub mod utils;

pub use aggregation::{
    aggregate, summarize_tiers, Aggregation, CategorySummary, GroupDimension, GroupKey,
    Groupable, TierSummary,
};
pub use cash_flow::{build_cash_flow, CashBalances, CashFlow, CashFlowBuilder, CashFlowReport};
pub use classifier::{classify, AbcClassifier, AbcItem, AbcThresholds, AbcTier};
pub use error::{AnalyticsError, DataQualityWarning, Result};
pub use ingestion::*;
pub use pnl::{build_profit_and_loss, MarketplaceResult, ProfitAndLoss, ProfitAndLossReport};
pub use schema::*;
pub use statement::{CategoryAmount, LineUnit, StatementLine};
pub use taxonomy::{
    BelowTheLine, CashFlowSection, CashFlowTaxonomy, CostTaxonomy, MarketplaceCosts,
};

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything one dashboard request needs besides the records themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportConfig {
    #[schemars(
        description = "Reporting period, 'YYYY-MM' or 'YYYY-MM:YYYY-MM'. When absent every record is used."
    )]
    #[serde(default)]
    pub period: Option<String>,

    #[schemars(description = "Metric used for ABC ranking")]
    #[serde(default)]
    pub metric: AnalysisMetric,

    #[serde(default)]
    pub thresholds: AbcThresholds,

    #[serde(default = "CostTaxonomy::marketplace_default")]
    pub taxonomy: CostTaxonomy,

    #[serde(default)]
    pub cash_flow_taxonomy: CashFlowTaxonomy,

    #[serde(default)]
    pub balances: CashBalances,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            period: None,
            metric: AnalysisMetric::default(),
            thresholds: AbcThresholds::default(),
            taxonomy: CostTaxonomy::marketplace_default(),
            cash_flow_taxonomy: CashFlowTaxonomy::default(),
            balances: CashBalances::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        // surface a bad selector as UnknownMetric rather than a serde error
        if let Some(metric) = value.get("metric").and_then(|m| m.as_str()) {
            metric.parse::<AnalysisMetric>()?;
        }

        let config: ReportConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn resolve_period(&self) -> Result<DateRange> {
        match &self.period {
            Some(period) => DateRange::parse(period),
            None => Ok(DateRange::unbounded()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.resolve_period()?;
        self.thresholds.validate()?;
        self.taxonomy.validate()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub period: DateRange,
    /// Sales of the period ranked into tiers.
    pub abc_items: Vec<AbcItem>,
    pub tier_summary: Vec<TierSummary>,
    pub sales_by_marketplace: Aggregation,
    pub profit_and_loss: ProfitAndLossReport,
    pub cash_flow: CashFlowReport,
}

impl DashboardReport {
    pub fn warning_count(&self) -> usize {
        self.profit_and_loss.warnings.len() + self.cash_flow.warnings.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct ReportProcessor;

impl ReportProcessor {
    pub fn process(rows: &[RawRecord], config: &ReportConfig) -> Result<DashboardReport> {
        config.validate()?;
        let records = normalize_records(rows);
        Self::process_records(&records, config)
    }

    pub fn process_records(
        records: &[FinancialRecord],
        config: &ReportConfig,
    ) -> Result<DashboardReport> {
        config.validate()?;
        let period = config.resolve_period()?;

        info!(
            "Building dashboard for {} from {} records",
            period,
            records.len()
        );

        let sales: Vec<FinancialRecord> = records
            .iter()
            .filter(|r| r.kind == RecordKind::Sale && period.contains(r.date))
            .cloned()
            .collect();
        debug!("{} sales inside the period", sales.len());

        let classifier = AbcClassifier::new(config.metric, config.thresholds)?;
        let abc_items = classifier.classify(&sales);
        let tier_summary = summarize_tiers(&abc_items);
        let sales_by_marketplace = aggregate(&sales, &[GroupDimension::Marketplace]);

        let profit_and_loss = build_profit_and_loss(records, period, &config.taxonomy)?;
        let cash_flow = CashFlowBuilder::new(config.cash_flow_taxonomy.clone()).build(
            records,
            period,
            config.balances,
        );

        let report = DashboardReport {
            period,
            abc_items,
            tier_summary,
            sales_by_marketplace,
            profit_and_loss,
            cash_flow,
        };

        debug!("Dashboard ready with {} warnings", report.warning_count());

        Ok(report)
    }
}

pub fn process_dashboard(rows: &[RawRecord], config: &ReportConfig) -> Result<DashboardReport> {
    ReportProcessor::process(rows, config)
}
