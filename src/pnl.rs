use crate::error::{DataQualityWarning, Result};
use crate::schema::{DateRange, FinancialRecord, Marketplace, RecordKind};
use crate::statement::{CategoryAmount, CategoryTotals, StatementLine};
use crate::taxonomy::{BelowTheLineKind, CostAttribution, CostTaxonomy};
use crate::utils::percent_of;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const COST_OF_GOODS_LABEL: &str = "Cost of goods";
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";
pub const UNASSIGNED_SECTION_LABEL: &str = "Unassigned";

/// Profit & Loss figures for one marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceResult {
    /// `None` collects revenue that carries no marketplace.
    pub marketplace: Option<Marketplace>,
    pub revenue: f64,
    pub cost_of_goods: f64,
    /// Direct category costs, not including cost of goods.
    pub direct_costs: Vec<CategoryAmount>,
    /// Cost of goods plus all direct category costs.
    pub direct_total: f64,
    pub operational_profit: f64,
    pub operational_margin: f64,
    pub indirect_costs: Vec<CategoryAmount>,
    pub indirect_total: f64,
    pub marketplace_profit: f64,
    pub marketplace_margin: f64,
}

impl MarketplaceResult {
    pub fn label(&self) -> &'static str {
        self.marketplace
            .map(|m| m.label())
            .unwrap_or(UNASSIGNED_SECTION_LABEL)
    }

    fn to_line(&self) -> StatementLine {
        let mut direct_children = vec![StatementLine::money(COST_OF_GOODS_LABEL, self.cost_of_goods)];
        direct_children.extend(
            self.direct_costs
                .iter()
                .map(|c| StatementLine::money(c.category.clone(), c.amount)),
        );

        StatementLine::money(self.label(), self.marketplace_profit).with_children(vec![
            StatementLine::money("Revenue", self.revenue),
            StatementLine::money("Direct costs", self.direct_total).with_children(direct_children),
            StatementLine::money("Operational profit", self.operational_profit),
            StatementLine::percent("Operational margin", self.operational_margin),
            StatementLine::breakdown("Indirect costs", self.indirect_total, &self.indirect_costs),
            StatementLine::money("Marketplace profit", self.marketplace_profit),
            StatementLine::percent("Marketplace margin", self.marketplace_margin),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub period: DateRange,
    pub marketplaces: Vec<MarketplaceResult>,
    pub total_revenue: f64,
    pub other_costs: Vec<CategoryAmount>,
    pub other_costs_total: f64,
    pub profit_before_tax: f64,
    pub taxes: Vec<CategoryAmount>,
    pub taxes_total: f64,
    pub other_payments: Vec<CategoryAmount>,
    pub other_payments_total: f64,
    pub owner_contributions: Vec<CategoryAmount>,
    pub owner_contributions_total: f64,
    pub net_profit: f64,
}

impl ProfitAndLoss {
    pub fn marketplace(&self, marketplace: Option<Marketplace>) -> Option<&MarketplaceResult> {
        self.marketplaces.iter().find(|m| m.marketplace == marketplace)
    }

    pub fn to_statement(&self) -> StatementLine {
        let mut before_tax: Vec<StatementLine> =
            self.marketplaces.iter().map(MarketplaceResult::to_line).collect();
        before_tax.push(StatementLine::breakdown(
            "Other costs",
            self.other_costs_total,
            &self.other_costs,
        ));

        StatementLine::money("Net profit", self.net_profit).with_children(vec![
            StatementLine::money("Profit before tax", self.profit_before_tax)
                .with_children(before_tax),
            StatementLine::breakdown("Taxes", self.taxes_total, &self.taxes),
            StatementLine::breakdown(
                "Other payments",
                self.other_payments_total,
                &self.other_payments,
            ),
            StatementLine::breakdown(
                "Owner contributions",
                self.owner_contributions_total,
                &self.owner_contributions,
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLossReport {
    pub profit_and_loss: ProfitAndLoss,
    pub statement: StatementLine,
    pub warnings: Vec<DataQualityWarning>,
}

struct MarketplaceAccumulator {
    marketplace: Option<Marketplace>,
    revenue: f64,
    cost_of_goods: f64,
    direct: CategoryTotals,
    indirect: CategoryTotals,
}

impl MarketplaceAccumulator {
    fn new(marketplace: Option<Marketplace>, taxonomy: &CostTaxonomy) -> Self {
        let costs = marketplace.and_then(|m| taxonomy.for_marketplace(m));
        Self {
            marketplace,
            revenue: 0.0,
            cost_of_goods: 0.0,
            direct: costs
                .map(|c| CategoryTotals::seeded(&c.direct))
                .unwrap_or_default(),
            indirect: costs
                .map(|c| CategoryTotals::seeded(&c.indirect))
                .unwrap_or_default(),
        }
    }

    fn finish(self) -> MarketplaceResult {
        let direct_total = self.cost_of_goods + self.direct.total();
        let operational_profit = self.revenue - direct_total;
        let indirect_total = self.indirect.total();
        let marketplace_profit = operational_profit - indirect_total;

        MarketplaceResult {
            marketplace: self.marketplace,
            revenue: self.revenue,
            cost_of_goods: self.cost_of_goods,
            direct_costs: self.direct.into_vec(),
            direct_total,
            operational_profit,
            operational_margin: percent_of(operational_profit, self.revenue),
            indirect_costs: self.indirect.into_vec(),
            indirect_total,
            marketplace_profit,
            marketplace_margin: percent_of(marketplace_profit, self.revenue),
        }
    }
}

struct ProfitAndLossBuilder<'a> {
    taxonomy: &'a CostTaxonomy,
    sections: Vec<MarketplaceAccumulator>,
    other_costs: CategoryTotals,
    taxes: CategoryTotals,
    other_payments: CategoryTotals,
    owner_contributions: CategoryTotals,
    warnings: Vec<DataQualityWarning>,
}

impl<'a> ProfitAndLossBuilder<'a> {
    fn new(taxonomy: &'a CostTaxonomy) -> Self {
        let btl = &taxonomy.below_the_line;
        Self {
            taxonomy,
            sections: taxonomy
                .marketplaces
                .iter()
                .map(|m| MarketplaceAccumulator::new(Some(m.marketplace), taxonomy))
                .collect(),
            other_costs: CategoryTotals::seeded(&taxonomy.general),
            taxes: CategoryTotals::seeded(&btl.taxes),
            other_payments: CategoryTotals::seeded(&btl.other_payments),
            owner_contributions: CategoryTotals::seeded(&btl.owner_contributions),
            warnings: Vec::new(),
        }
    }

    fn flag(&mut self, warning: DataQualityWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn section(&mut self, marketplace: Option<Marketplace>) -> &mut MarketplaceAccumulator {
        let idx = match self.sections.iter().position(|s| s.marketplace == marketplace) {
            Some(idx) => idx,
            None => {
                if let Some(m) = marketplace {
                    self.flag(DataQualityWarning::UnknownMarketplace { marketplace: m });
                }
                self.sections
                    .push(MarketplaceAccumulator::new(marketplace, self.taxonomy));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    fn add_income(&mut self, record: &FinancialRecord) {
        if record.kind == RecordKind::PaymentIncome {
            let btl = record
                .category
                .as_deref()
                .and_then(|c| self.taxonomy.below_the_line_kind(c));
            if btl == Some(BelowTheLineKind::OwnerContribution) {
                self.owner_contributions
                    .add(record.category_label(), record.amount);
                return;
            }
        }

        if record.marketplace.is_none() {
            self.flag(DataQualityWarning::UnassignedRevenue {
                record_id: record.id.clone(),
            });
        }
        self.section(record.marketplace).revenue += record.amount;
    }

    fn add_cost_of_goods(&mut self, record: &FinancialRecord) {
        match record.marketplace {
            Some(m) => self.section(Some(m)).cost_of_goods += record.amount,
            None => {
                self.other_costs.add(COST_OF_GOODS_LABEL, record.amount);
                self.flag(DataQualityWarning::UnassignedMarketplace {
                    record_id: record.id.clone(),
                    category: COST_OF_GOODS_LABEL.to_string(),
                });
            }
        }
    }

    fn add_expense(&mut self, record: &FinancialRecord) {
        let category = record.category.as_deref();
        let amount = record.amount;
        match self.taxonomy.attribute_cost(record.marketplace, category) {
            CostAttribution::Direct(m) => {
                self.section(Some(m)).direct.add(record.category_label(), amount)
            }
            CostAttribution::Indirect(m) => {
                self.section(Some(m)).indirect.add(record.category_label(), amount)
            }
            CostAttribution::General => self.other_costs.add(record.category_label(), amount),
            CostAttribution::BelowTheLine(BelowTheLineKind::Tax) => {
                self.taxes.add(record.category_label(), amount)
            }
            CostAttribution::BelowTheLine(BelowTheLineKind::OtherPayment) => {
                self.other_payments.add(record.category_label(), amount)
            }
            // money returned to the owner reduces the contributions
            CostAttribution::BelowTheLine(BelowTheLineKind::OwnerContribution) => self
                .owner_contributions
                .add(record.category_label(), -amount),
            CostAttribution::Unknown => {
                let label = category.unwrap_or(UNCATEGORIZED_LABEL).to_string();
                if category.is_none() {
                    self.flag(DataQualityWarning::UncategorizedExpense {
                        record_id: record.id.clone(),
                    });
                }

                match record.marketplace {
                    Some(m) => {
                        // an unlisted marketplace is reported once for the whole section
                        if category.is_some() && self.taxonomy.for_marketplace(m).is_some() {
                            self.flag(DataQualityWarning::UnknownCategory {
                                record_id: record.id.clone(),
                                marketplace: m,
                                category: label.clone(),
                            });
                        }
                        self.section(Some(m)).indirect.add(&label, amount);
                    }
                    None => {
                        if category.is_some() {
                            self.flag(DataQualityWarning::UnassignedMarketplace {
                                record_id: record.id.clone(),
                                category: label.clone(),
                            });
                        }
                        self.other_costs.add(&label, amount);
                    }
                }
            }
        }
    }

    fn finish(self, period: DateRange) -> ProfitAndLossReport {
        let mut sections = self.sections;
        // sections without a marketplace always come last
        sections.sort_by_key(|s| s.marketplace.is_none());

        let marketplaces: Vec<MarketplaceResult> =
            sections.into_iter().map(MarketplaceAccumulator::finish).collect();

        let total_revenue: f64 = marketplaces.iter().map(|m| m.revenue).sum();
        let other_costs_total = self.other_costs.total();
        let profit_before_tax: f64 =
            marketplaces.iter().map(|m| m.marketplace_profit).sum::<f64>() - other_costs_total;

        let taxes_total = self.taxes.total();
        let other_payments_total = self.other_payments.total();
        let owner_contributions_total = self.owner_contributions.total();
        let net_profit =
            profit_before_tax - taxes_total - other_payments_total + owner_contributions_total;

        let profit_and_loss = ProfitAndLoss {
            period,
            marketplaces,
            total_revenue,
            other_costs: self.other_costs.into_vec(),
            other_costs_total,
            profit_before_tax,
            taxes: self.taxes.into_vec(),
            taxes_total,
            other_payments: self.other_payments.into_vec(),
            other_payments_total,
            owner_contributions: self.owner_contributions.into_vec(),
            owner_contributions_total,
            net_profit,
        };

        ProfitAndLossReport {
            statement: profit_and_loss.to_statement(),
            profit_and_loss,
            warnings: self.warnings,
        }
    }
}

/// Folds the records dated inside `period` into a Profit & Loss statement.
///
/// Revenue, direct costs (cost of goods first, then the taxonomy's direct
/// categories), operational profit, indirect costs and marketplace profit are
/// computed per marketplace. Costs without a marketplace are "other costs",
/// subtracted once from the sum of marketplace profits to give profit before tax.
/// Net profit then removes taxes and other payments and adds owner contributions.
///
/// Data problems never abort the statement; they come back as warnings.
pub fn build_profit_and_loss(
    records: &[FinancialRecord],
    period: DateRange,
    taxonomy: &CostTaxonomy,
) -> Result<ProfitAndLossReport> {
    taxonomy.validate()?;

    let mut builder = ProfitAndLossBuilder::new(taxonomy);
    let mut considered = 0usize;

    for record in records.iter().filter(|r| period.contains(r.date)) {
        considered += 1;
        match record.kind {
            RecordKind::Sale | RecordKind::PaymentIncome => builder.add_income(record),
            RecordKind::CostOfGoods => builder.add_cost_of_goods(record),
            RecordKind::Expense | RecordKind::PaymentExpense => builder.add_expense(record),
        }
    }

    debug!(
        "P&L for {}: {} of {} records inside the period",
        period,
        considered,
        records.len()
    );

    let report = builder.finish(period);
    info!(
        "P&L for {}: net profit {:.2}, {} warnings",
        period,
        report.profit_and_loss.net_profit,
        report.warnings.len()
    );

    Ok(report)
}
