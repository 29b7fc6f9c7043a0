use crate::schema::{FinancialRecord, Marketplace, RecordKind};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A sale row as delivered by the data-access collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRow {
    pub id: String,
    pub date: NaiveDate,
    pub marketplace: Option<String>,
    /// Product group, if the collaborator tracks one.
    #[serde(default)]
    pub category: Option<String>,
    pub quantity: f64,
    pub revenue: f64,
    /// Purchase cost of the goods sold in this row, used to derive profit.
    #[serde(default)]
    pub cost_of_goods: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub id: String,
    pub date: NaiveDate,
    pub marketplace: Option<String>,
    pub category: Option<String>,
    pub amount: f64,
}

/// Bank payment. Positive amounts are incoming, negative amounts outgoing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRow {
    pub id: String,
    pub date: NaiveDate,
    pub marketplace: Option<String>,
    pub category: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CogsRow {
    pub id: String,
    pub date: NaiveDate,
    pub marketplace: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRecord {
    Sale(SaleRow),
    Expense(ExpenseRow),
    Payment(PaymentRow),
    CostOfGoods(CogsRow),
}

impl RawRecord {
    pub fn id(&self) -> &str {
        match self {
            RawRecord::Sale(row) => &row.id,
            RawRecord::Expense(row) => &row.id,
            RawRecord::Payment(row) => &row.id,
            RawRecord::CostOfGoods(row) => &row.id,
        }
    }
}

/// Converts one raw row into a [`FinancialRecord`].
///
/// Amounts are stored unsigned. `profit` carries the signed contribution of the
/// record: sales earn revenue minus cost of goods, incoming payments earn their
/// amount, every expense-like record contributes its negated amount.
pub fn normalize_record(raw: &RawRecord) -> FinancialRecord {
    match raw {
        RawRecord::Sale(row) => {
            let revenue = unsigned_amount(&row.id, "revenue", row.revenue);
            let quantity = unsigned_amount(&row.id, "quantity", row.quantity);
            let cost = row
                .cost_of_goods
                .map(|c| unsigned_amount(&row.id, "cost_of_goods", c))
                .unwrap_or(0.0);

            FinancialRecord {
                id: row.id.clone(),
                date: row.date,
                marketplace: Marketplace::parse_tag(row.marketplace.as_deref()),
                category: clean_category(row.category.as_deref()),
                kind: RecordKind::Sale,
                quantity,
                amount: revenue,
                profit: revenue - cost,
            }
        }
        RawRecord::Expense(row) => {
            let amount = unsigned_amount(&row.id, "amount", row.amount);
            FinancialRecord {
                id: row.id.clone(),
                date: row.date,
                marketplace: Marketplace::parse_tag(row.marketplace.as_deref()),
                category: clean_category(row.category.as_deref()),
                kind: RecordKind::Expense,
                quantity: 0.0,
                amount,
                profit: -amount,
            }
        }
        RawRecord::Payment(row) => {
            let (kind, profit_sign) = if row.amount < 0.0 {
                (RecordKind::PaymentExpense, -1.0)
            } else {
                (RecordKind::PaymentIncome, 1.0)
            };
            let amount = finite_or_zero(&row.id, "amount", row.amount).abs();

            FinancialRecord {
                id: row.id.clone(),
                date: row.date,
                marketplace: Marketplace::parse_tag(row.marketplace.as_deref()),
                category: clean_category(row.category.as_deref()),
                kind,
                quantity: 0.0,
                amount,
                profit: profit_sign * amount,
            }
        }
        RawRecord::CostOfGoods(row) => {
            let amount = unsigned_amount(&row.id, "amount", row.amount);
            FinancialRecord {
                id: row.id.clone(),
                date: row.date,
                marketplace: Marketplace::parse_tag(row.marketplace.as_deref()),
                category: clean_category(row.category.as_deref()),
                kind: RecordKind::CostOfGoods,
                quantity: 0.0,
                amount,
                profit: -amount,
            }
        }
    }
}

/// Normalizes a batch, preserving input order.
pub fn normalize_records(rows: &[RawRecord]) -> Vec<FinancialRecord> {
    let records: Vec<FinancialRecord> = rows.iter().map(normalize_record).collect();
    debug!("Normalized {} raw records", records.len());
    records
}

fn clean_category(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn finite_or_zero(id: &str, field: &str, value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!("Record {}: non-finite {} replaced with 0", id, field);
        0.0
    }
}

fn unsigned_amount(id: &str, field: &str, value: f64) -> f64 {
    let value = finite_or_zero(id, field, value);
    if value < 0.0 {
        warn!(
            "Record {}: negative {} {} stored as its absolute value",
            id, field, value
        );
    }
    value.abs()
}
