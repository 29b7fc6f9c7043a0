use crate::error::{AnalyticsError, Result};
use crate::schema::Marketplace;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MarketplaceCosts {
    pub marketplace: Marketplace,

    #[schemars(
        description = "Expense categories attributable to this marketplace's sales (commission, logistics, storage)"
    )]
    #[serde(default)]
    pub direct: Vec<String>,

    #[schemars(
        description = "Expense categories charged to this marketplace but not driven by individual sales (advertising, subscriptions)"
    )]
    #[serde(default)]
    pub indirect: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct BelowTheLine {
    #[schemars(description = "Tax payment categories, subtracted from profit before tax")]
    #[serde(default)]
    pub taxes: Vec<String>,

    #[schemars(description = "Owner contribution categories, added back to net profit")]
    #[serde(default)]
    pub owner_contributions: Vec<String>,

    #[schemars(description = "Dividends, withdrawals and other payments made after tax")]
    #[serde(default)]
    pub other_payments: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BelowTheLineKind {
    Tax,
    OwnerContribution,
    OtherPayment,
}

/// Where a cost record lands in the Profit & Loss statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostAttribution {
    Direct(Marketplace),
    Indirect(Marketplace),
    /// Known shared overhead without a marketplace.
    General,
    BelowTheLine(BelowTheLineKind),
    /// Category missing or not listed anywhere for the record's marketplace.
    Unknown,
}

/// Chart of cost accounts for the Profit & Loss statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CostTaxonomy {
    #[schemars(description = "Per-marketplace cost categories, in statement order")]
    #[serde(default)]
    pub marketplaces: Vec<MarketplaceCosts>,

    #[schemars(
        description = "Shared overhead categories that legitimately carry no marketplace (rent, salaries)"
    )]
    #[serde(default)]
    pub general: Vec<String>,

    #[serde(default)]
    pub below_the_line: BelowTheLine,
}

/// Lookup key for a category label: trimmed, case folded.
pub(crate) fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}

fn same_label(a: &str, b: &str) -> bool {
    label_key(a) == label_key(b)
}

fn listed(list: &[String], category: &str) -> bool {
    list.iter().any(|c| same_label(c, category))
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl CostTaxonomy {
    /// Typical Wildberries / Ozon chart of costs.
    pub fn marketplace_default() -> Self {
        let direct = labels(&[
            "Комиссия",
            "Логистика",
            "Хранение",
            "Приемка",
            "Эквайринг",
            "Штрафы",
        ]);
        let indirect = labels(&["Реклама", "Продвижение", "Подписка"]);

        Self {
            marketplaces: vec![
                MarketplaceCosts {
                    marketplace: Marketplace::Wb,
                    direct: direct.clone(),
                    indirect: indirect.clone(),
                },
                MarketplaceCosts {
                    marketplace: Marketplace::Ozon,
                    direct,
                    indirect,
                },
            ],
            general: labels(&["Зарплата", "Аренда", "Бухгалтерия", "Сервисы", "Упаковка"]),
            below_the_line: BelowTheLine {
                taxes: labels(&["Налоги", "УСН", "НДС"]),
                owner_contributions: labels(&["Вклад собственника"]),
                other_payments: labels(&["Дивиденды", "Вывод средств"]),
            },
        }
    }

    pub fn for_marketplace(&self, marketplace: Marketplace) -> Option<&MarketplaceCosts> {
        self.marketplaces.iter().find(|m| m.marketplace == marketplace)
    }

    pub fn below_the_line_kind(&self, category: &str) -> Option<BelowTheLineKind> {
        let btl = &self.below_the_line;
        if listed(&btl.taxes, category) {
            Some(BelowTheLineKind::Tax)
        } else if listed(&btl.owner_contributions, category) {
            Some(BelowTheLineKind::OwnerContribution)
        } else if listed(&btl.other_payments, category) {
            Some(BelowTheLineKind::OtherPayment)
        } else {
            None
        }
    }

    /// Resolves a cost record's statement position. Below-the-line categories win
    /// regardless of marketplace. A `general` category that carries a marketplace is
    /// an indirect cost of that marketplace; without one it stays general overhead.
    pub fn attribute_cost(
        &self,
        marketplace: Option<Marketplace>,
        category: Option<&str>,
    ) -> CostAttribution {
        let Some(category) = category else {
            return CostAttribution::Unknown;
        };

        if let Some(kind) = self.below_the_line_kind(category) {
            return CostAttribution::BelowTheLine(kind);
        }

        match marketplace {
            Some(m) => match self.for_marketplace(m) {
                Some(costs) if listed(&costs.direct, category) => CostAttribution::Direct(m),
                Some(costs) if listed(&costs.indirect, category) => CostAttribution::Indirect(m),
                _ if listed(&self.general, category) => CostAttribution::Indirect(m),
                _ => CostAttribution::Unknown,
            },
            None if listed(&self.general, category) => CostAttribution::General,
            None => CostAttribution::Unknown,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for costs in &self.marketplaces {
            if !seen.insert(costs.marketplace) {
                return Err(AnalyticsError::InvalidParameter {
                    parameter: "taxonomy.marketplaces".to_string(),
                    details: format!("marketplace {} is listed twice", costs.marketplace),
                });
            }

            if let Some(both) = costs.direct.iter().find(|c| listed(&costs.indirect, c)) {
                return Err(AnalyticsError::InvalidParameter {
                    parameter: "taxonomy.marketplaces".to_string(),
                    details: format!(
                        "category '{}' is both direct and indirect for {}",
                        both, costs.marketplace
                    ),
                });
            }
        }

        let cost_categories = self
            .marketplaces
            .iter()
            .flat_map(|m| m.direct.iter().chain(m.indirect.iter()))
            .chain(self.general.iter());

        for category in cost_categories {
            if self.below_the_line_kind(category).is_some() {
                return Err(AnalyticsError::InvalidParameter {
                    parameter: "taxonomy.below_the_line".to_string(),
                    details: format!(
                        "category '{}' is both a cost and a below-the-line item",
                        category
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CostTaxonomy)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let taxonomy: CostTaxonomy = serde_json::from_str(json)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("# Cost Taxonomy\n\n");

        for costs in &self.marketplaces {
            output.push_str(&format!("## {}\n\n", costs.marketplace));

            output.push_str("### Direct\n\n");
            for category in &costs.direct {
                output.push_str(&format!("- {}\n", category));
            }
            output.push('\n');

            output.push_str("### Indirect\n\n");
            for category in &costs.indirect {
                output.push_str(&format!("- {}\n", category));
            }
            output.push('\n');
        }

        output.push_str("## General\n\n");
        for category in &self.general {
            output.push_str(&format!("- {}\n", category));
        }
        output.push('\n');

        output.push_str("## Below the line\n\n");
        let btl = &self.below_the_line;
        for (title, list) in [
            ("Taxes", &btl.taxes),
            ("Owner contributions", &btl.owner_contributions),
            ("Other payments", &btl.other_payments),
        ] {
            output.push_str(&format!("### {}\n\n", title));
            for category in list {
                output.push_str(&format!("- {}\n", category));
            }
            output.push('\n');
        }

        output
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowSection {
    Operational,
    Investment,
    Financial,
}

/// Assigns payment categories to cash flow sections. Anything not listed is
/// operational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CashFlowTaxonomy {
    #[serde(default)]
    pub investment: Vec<String>,

    #[serde(default)]
    pub financial_income: Vec<String>,

    #[serde(default)]
    pub financial_expense: Vec<String>,
}

impl Default for CashFlowTaxonomy {
    fn default() -> Self {
        Self {
            investment: labels(&["Инвестиции", "Продажа оборудования", "Проценты по депозиту"]),
            financial_income: labels(&["Кредит", "Займ", "Вклад собственника"]),
            financial_expense: labels(&[
                "Погашение кредита",
                "Погашение займа",
                "Проценты по кредиту",
                "Дивиденды",
                "Вывод средств",
            ]),
        }
    }
}

impl CashFlowTaxonomy {
    pub fn section_for(&self, category: Option<&str>) -> CashFlowSection {
        match category {
            Some(c) if listed(&self.investment, c) => CashFlowSection::Investment,
            Some(c) if listed(&self.financial_income, c) || listed(&self.financial_expense, c) => {
                CashFlowSection::Financial
            }
            _ => CashFlowSection::Operational,
        }
    }
}
