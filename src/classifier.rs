use crate::error::{AnalyticsError, Result};
use crate::schema::{AnalysisMetric, FinancialRecord};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AbcTier {
    A,
    B,
    C,
}

impl AbcTier {
    pub fn label(&self) -> &'static str {
        match self {
            AbcTier::A => "A",
            AbcTier::B => "B",
            AbcTier::C => "C",
        }
    }
}

impl fmt::Display for AbcTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cumulative-share cut-offs, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AbcThresholds {
    #[schemars(description = "Upper cumulative share (percent) for tier A. Default 80.")]
    pub a: f64,

    #[schemars(description = "Upper cumulative share (percent) for tier B. Default 95.")]
    pub b: f64,
}

impl Default for AbcThresholds {
    fn default() -> Self {
        Self { a: 80.0, b: 95.0 }
    }
}

impl AbcThresholds {
    pub fn new(a: f64, b: f64) -> Result<Self> {
        let thresholds = Self { a, b };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Requires `0 < a < b <= 100`.
    pub fn validate(&self) -> Result<()> {
        let ordered = self.a.is_finite()
            && self.b.is_finite()
            && self.a > 0.0
            && self.a < self.b
            && self.b <= 100.0;

        if !ordered {
            return Err(AnalyticsError::InvalidThresholds {
                threshold_a: self.a,
                threshold_b: self.b,
            });
        }
        Ok(())
    }

    pub fn tier_for(&self, cumulative_share: f64) -> AbcTier {
        if cumulative_share <= self.a {
            AbcTier::A
        } else if cumulative_share <= self.b {
            AbcTier::B
        } else {
            AbcTier::C
        }
    }
}

/// One record after classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcItem {
    pub record: FinancialRecord,
    /// 1-based position in the descending ranking.
    pub rank: usize,
    pub metric_value: f64,
    pub tier: AbcTier,
    pub cumulative_share: f64,
}

/// Holds a classification policy. Every call to [`AbcClassifier::classify`] is a pure
/// function of its input and the policy, so re-splitting the same records under
/// other thresholds is just another classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbcClassifier {
    metric: AnalysisMetric,
    thresholds: AbcThresholds,
}

impl AbcClassifier {
    pub fn new(metric: AnalysisMetric, thresholds: AbcThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { metric, thresholds })
    }

    pub fn metric(&self) -> AnalysisMetric {
        self.metric
    }

    pub fn thresholds(&self) -> AbcThresholds {
        self.thresholds
    }

    pub fn with_thresholds(&self, thresholds: AbcThresholds) -> Result<Self> {
        Self::new(self.metric, thresholds)
    }

    pub fn classify(&self, records: &[FinancialRecord]) -> Vec<AbcItem> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(&FinancialRecord, f64)> = records
            .iter()
            .map(|r| (r, r.metric_value(self.metric)))
            .collect();

        // sort_by is stable: equal values keep batch order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let total: f64 = ranked.iter().map(|(_, v)| v).sum();

        debug!(
            "Classifying {} records by {} (total {}, thresholds {}/{})",
            ranked.len(),
            self.metric,
            total,
            self.thresholds.a,
            self.thresholds.b
        );

        if total <= 0.0 {
            return ranked
                .into_iter()
                .enumerate()
                .map(|(idx, (record, value))| AbcItem {
                    record: record.clone(),
                    rank: idx + 1,
                    metric_value: value,
                    tier: AbcTier::C,
                    cumulative_share: 0.0,
                })
                .collect();
        }

        let mut running = 0.0;
        ranked
            .into_iter()
            .enumerate()
            .map(|(idx, (record, value))| {
                running += value;
                let cumulative_share = (running / total * 100.0).clamp(0.0, 100.0);
                AbcItem {
                    record: record.clone(),
                    rank: idx + 1,
                    metric_value: value,
                    tier: self.thresholds.tier_for(cumulative_share),
                    cumulative_share,
                }
            })
            .collect()
    }
}

impl Default for AbcClassifier {
    fn default() -> Self {
        Self {
            metric: AnalysisMetric::default(),
            thresholds: AbcThresholds::default(),
        }
    }
}

/// Ranks `records` by `metric` and assigns A/B/C tiers by cumulative share.
pub fn classify(
    records: &[FinancialRecord],
    metric: AnalysisMetric,
    threshold_a: f64,
    threshold_b: f64,
) -> Result<Vec<AbcItem>> {
    let classifier = AbcClassifier::new(metric, AbcThresholds::new(threshold_a, threshold_b)?)?;
    Ok(classifier.classify(records))
}
