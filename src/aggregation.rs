use crate::classifier::{AbcItem, AbcTier};
use crate::schema::{marketplace_label, FinancialRecord, UNASSIGNED};
use crate::utils::{month_key, percent_of};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimension {
    Tier,
    Category,
    Marketplace,
    /// Calendar month of the record date, keyed "YYYY-MM".
    Month,
}

/// Anything that can be folded into a [`CategorySummary`].
pub trait Groupable {
    fn record(&self) -> &FinancialRecord;

    fn tier(&self) -> Option<AbcTier> {
        None
    }

    fn dimension_value(&self, dimension: GroupDimension) -> String {
        let record = self.record();
        match dimension {
            GroupDimension::Tier => self
                .tier()
                .map(|t| t.label().to_string())
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            GroupDimension::Category => record.category_label().to_string(),
            GroupDimension::Marketplace => marketplace_label(record.marketplace).to_string(),
            GroupDimension::Month => month_key(record.date),
        }
    }
}

impl Groupable for FinancialRecord {
    fn record(&self) -> &FinancialRecord {
        self
    }
}

impl Groupable for AbcItem {
    fn record(&self) -> &FinancialRecord {
        &self.record
    }

    fn tier(&self) -> Option<AbcTier> {
        Some(self.tier)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub count: usize,
    pub sum_sales_volume: f64,
    /// Sum of record amounts: revenue for sales, spend for expenses.
    pub sum_revenue: f64,
    pub sum_profit: f64,
}

impl CategorySummary {
    pub fn add(&mut self, record: &FinancialRecord) {
        self.count += 1;
        self.sum_sales_volume += record.quantity;
        self.sum_revenue += record.amount;
        self.sum_profit += record.profit;
    }
}

/// Ordered tuple of dimension values, in the order the dimensions were requested.
pub type GroupKey = Vec<String>;

/// Grouped summaries. Iteration follows the order in which each group was first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub dimensions: Vec<GroupDimension>,
    // tuple keys are not valid JSON object keys, so groups travel as a list of pairs
    #[serde(with = "indexmap::map::serde_seq")]
    groups: IndexMap<GroupKey, CategorySummary>,
}

impl Aggregation {
    fn new(dimensions: &[GroupDimension]) -> Self {
        Self {
            dimensions: dimensions.to_vec(),
            groups: IndexMap::new(),
        }
    }

    pub fn get<S: AsRef<str>>(&self, key: &[S]) -> Option<&CategorySummary> {
        let key: GroupKey = key.iter().map(|k| k.as_ref().to_string()).collect();
        self.groups.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &CategorySummary)> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.groups.values().map(|s| s.count).sum()
    }
}

/// Groups `items` by the requested dimensions. Missing dimension values land in the
/// `"unassigned"` bucket. An empty dimension list yields a single grand-total group.
pub fn aggregate<T: Groupable>(items: &[T], group_by: &[GroupDimension]) -> Aggregation {
    let mut aggregation = Aggregation::new(group_by);

    for item in items {
        let key: GroupKey = group_by.iter().map(|d| item.dimension_value(*d)).collect();
        aggregation.groups.entry(key).or_default().add(item.record());
    }

    aggregation
}

/// One row of the ABC report table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier: AbcTier,
    pub summary: CategorySummary,
    /// Sum of the classification metric inside the tier.
    pub metric_total: f64,
    /// Tier's share of the metric across all tiers, in percent.
    pub share_of_total: f64,
}

/// Summaries for tiers A, B and C, always all three in that order.
pub fn summarize_tiers(items: &[AbcItem]) -> Vec<TierSummary> {
    let by_tier = aggregate(items, &[GroupDimension::Tier]);
    let grand_total: f64 = items.iter().map(|i| i.metric_value).sum();

    [AbcTier::A, AbcTier::B, AbcTier::C]
        .into_iter()
        .map(|tier| {
            let metric_total: f64 = items
                .iter()
                .filter(|i| i.tier == tier)
                .map(|i| i.metric_value)
                .sum();

            TierSummary {
                tier,
                summary: by_tier.get(&[tier.label()]).cloned().unwrap_or_default(),
                metric_total,
                share_of_total: percent_of(metric_total, grand_total),
            }
        })
        .collect()
}
