use chrono::NaiveDate;
use marketplace_analytics::*;
use std::collections::HashSet;

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// A quarter of activity for a seller on WB and Ozon, with a few deliberately messy rows.
fn seller_quarter() -> Vec<RawRecord> {
    let mut rows = Vec::new();

    let products = [
        ("sku-boots", "WB", 42.0, 126_000.0, 63_000.0),
        ("sku-sneakers", "WB", 30.0, 75_000.0, 40_000.0),
        ("sku-socks", "OZON", 300.0, 24_000.0, 9_000.0),
        ("sku-laces", "OZON", 120.0, 6_000.0, 1_500.0),
        ("sku-insoles", "WB", 50.0, 15_000.0, 6_000.0),
        ("sku-cream", "OZON", 25.0, 4_000.0, 2_500.0),
        ("sku-brush", "WB", 10.0, 1_000.0, 400.0),
    ];

    for (month, factor) in [(1u32, 1.0), (2, 1.1), (3, 0.9)] {
        for (sku, marketplace, quantity, revenue, cost) in products {
            rows.push(RawRecord::Sale(SaleRow {
                id: format!("{}-{}", sku, month),
                date: day(month, 10),
                marketplace: Some(marketplace.to_string()),
                category: Some("Обувь и уход".to_string()),
                quantity: quantity * factor,
                revenue: revenue * factor,
                cost_of_goods: Some(cost * factor),
            }));
        }

        rows.push(RawRecord::CostOfGoods(CogsRow {
            id: format!("cogs-wb-{}", month),
            date: day(month, 28),
            marketplace: Some("WB".to_string()),
            category: Some("Себестоимость".to_string()),
            amount: 109_400.0 * factor,
        }));
        rows.push(RawRecord::CostOfGoods(CogsRow {
            id: format!("cogs-ozon-{}", month),
            date: day(month, 28),
            marketplace: Some("OZON".to_string()),
            category: Some("Себестоимость".to_string()),
            amount: 13_000.0 * factor,
        }));

        for (id, marketplace, category, amount) in [
            ("wb-commission", Some("WB"), "Комиссия", 32_000.0),
            ("wb-logistics", Some("WB"), "Логистика", 12_000.0),
            ("wb-ads", Some("WB"), "Реклама", 8_000.0),
            ("ozon-commission", Some("OZON"), "Комиссия", 5_000.0),
            ("ozon-storage", Some("OZON"), "Хранение", 700.0),
            ("rent", None, "Аренда", 15_000.0),
            ("salary", None, "Зарплата", 40_000.0),
            ("tax", None, "УСН", 9_000.0),
        ] {
            rows.push(RawRecord::Expense(ExpenseRow {
                id: format!("{}-{}", id, month),
                date: day(month, 25),
                marketplace: marketplace.map(str::to_string),
                category: Some(category.to_string()),
                amount,
            }));
        }

        rows.push(RawRecord::Payment(PaymentRow {
            id: format!("payout-wb-{}", month),
            date: day(month, 15),
            marketplace: Some("WB".to_string()),
            category: Some("Выплата WB".to_string()),
            amount: 150_000.0,
        }));
        rows.push(RawRecord::Payment(PaymentRow {
            id: format!("packaging-{}", month),
            date: day(month, 5),
            marketplace: None,
            category: Some("Упаковка".to_string()),
            amount: -90_000.0,
        }));
    }

    rows.push(RawRecord::Payment(PaymentRow {
        id: "loan".to_string(),
        date: day(2, 1),
        marketplace: None,
        category: Some("Кредит".to_string()),
        amount: 100_000.0,
    }));
    rows.push(RawRecord::Payment(PaymentRow {
        id: "loan-repay".to_string(),
        date: day(3, 1),
        marketplace: None,
        category: Some("Погашение кредита".to_string()),
        amount: -20_000.0,
    }));
    rows.push(RawRecord::Payment(PaymentRow {
        id: "owner".to_string(),
        date: day(1, 3),
        marketplace: None,
        category: Some("Вклад собственника".to_string()),
        amount: 50_000.0,
    }));
    rows.push(RawRecord::Payment(PaymentRow {
        id: "dividends".to_string(),
        date: day(3, 30),
        marketplace: None,
        category: Some("Дивиденды".to_string()),
        amount: -30_000.0,
    }));

    // messy rows
    rows.push(RawRecord::Expense(ExpenseRow {
        id: "mystery-logistics".to_string(),
        date: day(2, 12),
        marketplace: None,
        category: Some("Логистика".to_string()),
        amount: 1_200.0,
    }));
    rows.push(RawRecord::Expense(ExpenseRow {
        id: "photo".to_string(),
        date: day(2, 12),
        marketplace: Some("OZON".to_string()),
        category: Some("Фотосессия".to_string()),
        amount: 3_000.0,
    }));

    // outside the quarter
    rows.push(RawRecord::Sale(SaleRow {
        id: "april-sale".to_string(),
        date: day(4, 2),
        marketplace: Some("WB".to_string()),
        category: None,
        quantity: 1.0,
        revenue: 1_000_000.0,
        cost_of_goods: None,
    }));

    rows
}

fn quarter_config() -> ReportConfig {
    ReportConfig {
        period: Some("2024-01:2024-03".to_string()),
        ..ReportConfig::default()
    }
}

fn sales(records: &[FinancialRecord]) -> Vec<FinancialRecord> {
    records
        .iter()
        .filter(|r| r.kind == RecordKind::Sale)
        .cloned()
        .collect()
}

#[test]
fn test_classification_is_idempotent() {
    let records = sales(&normalize_records(&seller_quarter()));

    for metric in [
        AnalysisMetric::Volume,
        AnalysisMetric::Revenue,
        AnalysisMetric::Profit,
    ] {
        let first = classify(&records, metric, 80.0, 95.0).unwrap();
        let second = classify(&records, metric, 80.0, 95.0).unwrap();
        assert_eq!(first, second, "metric {} is not reproducible", metric);
    }
}

#[test]
fn test_every_record_classified_exactly_once() {
    let records = sales(&normalize_records(&seller_quarter()));
    let items = classify(&records, AnalysisMetric::Revenue, 70.0, 90.0).unwrap();

    assert_eq!(items.len(), records.len());
    let ids: HashSet<&str> = items.iter().map(|i| i.record.id.as_str()).collect();
    assert_eq!(ids.len(), records.len());

    let by_tier = aggregate(&items, &[GroupDimension::Tier]);
    assert_eq!(by_tier.total_count(), records.len());

    let shares: Vec<f64> = items.iter().map(|i| i.cumulative_share).collect();
    assert!(shares.windows(2).all(|w| w[0] <= w[1]));
    assert!((shares.last().unwrap() - 100.0).abs() < 1e-9);
}

#[test]
fn test_raising_threshold_a_never_demotes() {
    let records = sales(&normalize_records(&seller_quarter()));

    let mut previous: Option<Vec<AbcItem>> = None;
    for a in (5..95).step_by(5) {
        let items = classify(&records, AnalysisMetric::Revenue, a as f64, 95.0).unwrap();

        if let Some(prev) = &previous {
            for (before, after) in prev.iter().zip(items.iter()) {
                assert_eq!(before.record.id, after.record.id);
                assert!(
                    after.tier <= before.tier,
                    "{} moved from {} to {} when A rose to {}",
                    after.record.id,
                    before.tier,
                    after.tier,
                    a
                );
                if before.tier == AbcTier::C {
                    assert_eq!(after.tier, AbcTier::C);
                }
            }
        }

        previous = Some(items);
    }
}

#[test]
fn test_profit_and_loss_balances() -> anyhow::Result<()> {
    let records = normalize_records(&seller_quarter());
    let period = DateRange::parse("2024-01:2024-03")?;
    let report = build_profit_and_loss(&records, period, &CostTaxonomy::marketplace_default())?;
    let pnl = &report.profit_and_loss;

    for m in &pnl.marketplaces {
        assert_eq!(m.operational_profit, m.revenue - m.direct_total);
        assert_eq!(m.marketplace_profit, m.operational_profit - m.indirect_total);
        let direct_sum: f64 = m.direct_costs.iter().map(|c| c.amount).sum();
        assert!((m.direct_total - (m.cost_of_goods + direct_sum)).abs() < 1e-6);
    }

    let section_profit: f64 = pnl.marketplaces.iter().map(|m| m.marketplace_profit).sum();
    assert_eq!(pnl.profit_before_tax, section_profit - pnl.other_costs_total);
    assert_eq!(
        pnl.net_profit,
        pnl.profit_before_tax - pnl.taxes_total - pnl.other_payments_total
            + pnl.owner_contributions_total
    );

    // April sale is outside the period
    assert!(pnl.total_revenue < 1_000_000.0);

    let wb = pnl.marketplace(Some(Marketplace::Wb)).unwrap();
    // three months of sales plus three WB payouts
    let expected_wb_revenue = (126_000.0 + 75_000.0 + 15_000.0 + 1_000.0) * 3.0 + 450_000.0;
    assert!((wb.revenue - expected_wb_revenue).abs() < 1e-6);
    assert!((wb.indirect_total - 24_000.0).abs() < 1e-6);

    assert!((pnl.taxes_total - 27_000.0).abs() < 1e-6);
    assert_eq!(pnl.owner_contributions_total, 50_000.0);
    assert_eq!(pnl.other_payments_total, 30_000.0);

    let other: Vec<&str> = pnl.other_costs.iter().map(|c| c.category.as_str()).collect();
    assert!(other.contains(&"Логистика"));
    assert!(other.contains(&"Погашение кредита"));
    let packaging = pnl.other_costs.iter().find(|c| c.category == "Упаковка").unwrap();
    assert_eq!(packaging.amount, 270_000.0);

    // the loan carries no marketplace, so it is unattributed revenue
    let unassigned = pnl.marketplace(None).unwrap();
    assert_eq!(unassigned.revenue, 100_000.0);
    assert_eq!(pnl.marketplaces.last().unwrap().marketplace, None);

    assert_eq!(report.warnings.len(), 4);
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        DataQualityWarning::UnassignedRevenue { record_id } if record_id == "loan"
    )));
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        DataQualityWarning::UnassignedMarketplace { record_id, .. } if record_id == "loan-repay"
    )));
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        DataQualityWarning::UnassignedMarketplace { record_id, .. } if record_id == "mystery-logistics"
    )));
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        DataQualityWarning::UnknownCategory { record_id, .. } if record_id == "photo"
    )));

    Ok(())
}

#[test]
fn test_statement_tree_matches_figures() -> anyhow::Result<()> {
    let records = normalize_records(&seller_quarter());
    let report = build_profit_and_loss(
        &records,
        DateRange::parse("2024-01:2024-03")?,
        &CostTaxonomy::marketplace_default(),
    )?;
    let root = &report.statement;
    let pnl = &report.profit_and_loss;

    assert_eq!(root.label, "Net profit");
    assert_eq!(root.amount, pnl.net_profit);

    let ozon = root
        .find(&["Profit before tax", "OZON"])
        .expect("OZON section");
    let ozon_figures = pnl.marketplace(Some(Marketplace::Ozon)).unwrap();
    assert_eq!(ozon.amount, ozon_figures.marketplace_profit);
    assert_eq!(
        ozon.find(&["Direct costs", "Cost of goods"]).unwrap().amount,
        ozon_figures.cost_of_goods
    );
    assert_eq!(ozon.child("Operational margin").unwrap().unit, LineUnit::Percent);

    let pbt = root.child("Profit before tax").unwrap();
    let children_sum: f64 = pbt
        .children
        .iter()
        .map(|c| {
            if c.label == "Other costs" {
                -c.amount
            } else {
                c.amount
            }
        })
        .sum();
    assert!((pbt.amount - children_sum).abs() < 1e-6);

    for line in root.flatten() {
        for child in &line.children {
            assert_eq!(child.depth, line.depth + 1);
        }
    }

    Ok(())
}

#[test]
fn test_cash_flow_for_quarter() {
    let records = normalize_records(&seller_quarter());
    let report = build_cash_flow(
        &records,
        DateRange::parse("2024-01:2024-03").unwrap(),
        CashBalances {
            opening: Some(25_000.0),
            closing: Some(80_000.0),
        },
    );
    let cf = &report.cash_flow;

    assert_eq!(cf.operational.income_total, 450_000.0);
    assert_eq!(cf.operational.expenses_total, 270_000.0);
    assert_eq!(cf.investment.total, 0.0);
    // loan in, repayment, owner contribution and dividends
    assert_eq!(cf.financial.income_total, 150_000.0);
    assert_eq!(cf.financial.expenses_total, 50_000.0);
    assert_eq!(
        cf.net_cash_flow,
        cf.operational.total + cf.investment.total + cf.financial.total
    );
    assert_eq!(cf.opening_balance, 25_000.0);
    assert_eq!(cf.closing_balance, 80_000.0);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_empty_batch() -> anyhow::Result<()> {
    let records: Vec<FinancialRecord> = Vec::new();

    assert!(classify(&records, AnalysisMetric::Revenue, 80.0, 95.0)?.is_empty());
    assert!(aggregate(&records, &[GroupDimension::Category]).is_empty());

    let report = build_profit_and_loss(
        &records,
        DateRange::parse("2024-01")?,
        &CostTaxonomy::marketplace_default(),
    )?;
    assert!(report.statement.flatten().iter().all(|l| l.amount == 0.0));

    let dashboard = ReportProcessor::process(&[], &quarter_config())?;
    assert!(dashboard.abc_items.is_empty());
    assert!(dashboard.tier_summary.iter().all(|t| t.summary.count == 0));
    assert_eq!(dashboard.cash_flow.cash_flow.net_cash_flow, 0.0);

    Ok(())
}

#[test]
fn test_dashboard_from_json_rows() -> anyhow::Result<()> {
    let json = serde_json::to_string(&seller_quarter())?;
    let rows: Vec<RawRecord> = serde_json::from_str(&json)?;

    let config = ReportConfig::from_json(
        r#"{
            "period": "2024-01:2024-03",
            "metric": "profit",
            "thresholds": {"a": 70.0, "b": 90.0},
            "balances": {"opening": 1000.0}
        }"#,
    )?;

    let report = process_dashboard(&rows, &config)?;

    assert_eq!(report.abc_items.len(), 21);
    assert!(report.abc_items[0].record.id.starts_with("sku-boots"));
    assert_eq!(report.tier_summary.len(), 3);
    let counted: usize = report.tier_summary.iter().map(|t| t.summary.count).sum();
    assert_eq!(counted, 21);

    let shares: f64 = report.tier_summary.iter().map(|t| t.share_of_total).sum();
    assert!((shares - 100.0).abs() < 1e-9);

    assert_eq!(report.sales_by_marketplace.len(), 2);
    assert_eq!(report.cash_flow.cash_flow.opening_balance, 1000.0);
    assert_eq!(report.warning_count(), 4);

    let exported = report.to_json()?;
    let back: DashboardReport = serde_json::from_str(&exported)?;
    assert_eq!(back, report);

    Ok(())
}

#[test]
fn test_dynamic_split_regroups_same_items() {
    let records = sales(&normalize_records(&seller_quarter()));
    let classifier = AbcClassifier::new(AnalysisMetric::Volume, AbcThresholds::default()).unwrap();

    let default_split = summarize_tiers(&classifier.classify(&records));
    let strict_split = summarize_tiers(
        &classifier
            .with_thresholds(AbcThresholds::new(50.0, 80.0).unwrap())
            .unwrap()
            .classify(&records),
    );

    assert!(strict_split[0].summary.count <= default_split[0].summary.count);

    let total = |split: &[TierSummary]| split.iter().map(|t| t.summary.count).sum::<usize>();
    assert_eq!(total(&default_split), total(&strict_split));
}
