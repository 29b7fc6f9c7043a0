use crate::error::DataQualityWarning;
use crate::pnl::UNCATEGORIZED_LABEL;
use crate::schema::{DateRange, FinancialRecord, RecordKind};
use crate::statement::{CategoryAmount, CategoryTotals, StatementLine};
use crate::taxonomy::{CashFlowSection, CashFlowTaxonomy};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Account balances supplied by the caller. They are reported, never computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashBalances {
    #[serde(default)]
    pub opening: Option<f64>,
    #[serde(default)]
    pub closing: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowActivity {
    pub income: Vec<CategoryAmount>,
    pub income_total: f64,
    pub expenses: Vec<CategoryAmount>,
    pub expenses_total: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub period: DateRange,
    pub operational: CashFlowActivity,
    /// Investment income only; investment spending is not modeled.
    pub investment: CashFlowActivity,
    pub financial: CashFlowActivity,
    pub net_cash_flow: f64,
    pub opening_balance: f64,
    pub closing_balance: f64,
}

impl CashFlow {
    pub fn to_statement(&self) -> StatementLine {
        let section = |label: &str, activity: &CashFlowActivity, with_expenses: bool| {
            let mut children = vec![StatementLine::breakdown(
                "Income",
                activity.income_total,
                &activity.income,
            )];
            if with_expenses {
                children.push(StatementLine::breakdown(
                    "Expenses",
                    activity.expenses_total,
                    &activity.expenses,
                ));
            }
            StatementLine::money(label, activity.total).with_children(children)
        };

        StatementLine::money("Net cash flow", self.net_cash_flow).with_children(vec![
            section("Operational activities", &self.operational, true),
            section("Investment activities", &self.investment, false),
            section("Financial activities", &self.financial, true),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowReport {
    pub cash_flow: CashFlow,
    pub statement: StatementLine,
    pub warnings: Vec<DataQualityWarning>,
}

#[derive(Default)]
struct ActivityTotals {
    income: CategoryTotals,
    expenses: CategoryTotals,
}

impl ActivityTotals {
    fn finish(self) -> CashFlowActivity {
        let income_total = self.income.total();
        let expenses_total = self.expenses.total();
        CashFlowActivity {
            income: self.income.into_vec(),
            income_total,
            expenses: self.expenses.into_vec(),
            expenses_total,
            total: income_total - expenses_total,
        }
    }
}

pub struct CashFlowBuilder {
    taxonomy: CashFlowTaxonomy,
}

impl CashFlowBuilder {
    pub fn new(taxonomy: CashFlowTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// Sums the payments dated inside `period` into operational, investment and
    /// financial activities. Non-payment records are ignored.
    pub fn build(
        &self,
        records: &[FinancialRecord],
        period: DateRange,
        balances: CashBalances,
    ) -> CashFlowReport {
        let mut operational = ActivityTotals::default();
        let mut investment = ActivityTotals::default();
        let mut financial = ActivityTotals::default();
        let mut warnings = Vec::new();

        let payments = records
            .iter()
            .filter(|r| r.kind.is_payment() && period.contains(r.date));

        for record in payments {
            let category = record.category.as_deref();
            let label = category.unwrap_or(UNCATEGORIZED_LABEL);
            let section = self.taxonomy.section_for(category);

            match (record.kind, section) {
                (RecordKind::PaymentIncome, CashFlowSection::Operational) => {
                    operational.income.add(label, record.amount)
                }
                (RecordKind::PaymentIncome, CashFlowSection::Investment) => {
                    investment.income.add(label, record.amount)
                }
                (RecordKind::PaymentIncome, CashFlowSection::Financial) => {
                    financial.income.add(label, record.amount)
                }
                (_, CashFlowSection::Operational) => {
                    if category.is_none() {
                        warnings.push(DataQualityWarning::UncategorizedExpense {
                            record_id: record.id.clone(),
                        });
                    }
                    operational.expenses.add(label, record.amount)
                }
                (_, CashFlowSection::Investment) => {
                    warnings.push(DataQualityWarning::InvestmentExpenseSkipped {
                        record_id: record.id.clone(),
                        category: label.to_string(),
                    });
                }
                (_, CashFlowSection::Financial) => financial.expenses.add(label, record.amount),
            }
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        let operational = operational.finish();
        let investment = investment.finish();
        let financial = financial.finish();
        let net_cash_flow = operational.total + investment.total + financial.total;

        debug!("Cash flow for {}: net {:.2}", period, net_cash_flow);

        let cash_flow = CashFlow {
            period,
            operational,
            investment,
            financial,
            net_cash_flow,
            opening_balance: balances.opening.unwrap_or(0.0),
            closing_balance: balances.closing.unwrap_or(0.0),
        };

        CashFlowReport {
            statement: cash_flow.to_statement(),
            cash_flow,
            warnings,
        }
    }
}

impl Default for CashFlowBuilder {
    fn default() -> Self {
        Self::new(CashFlowTaxonomy::default())
    }
}

/// Cash flow statement under the default payment taxonomy.
pub fn build_cash_flow(
    records: &[FinancialRecord],
    period: DateRange,
    balances: CashBalances,
) -> CashFlowReport {
    CashFlowBuilder::default().build(records, period, balances)
}
