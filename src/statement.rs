use crate::taxonomy::label_key;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineUnit {
    #[default]
    Money,
    Percent,
}

/// A node of a hierarchical statement. A parent's amount is always derived from
/// its children by the statement's own formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub label: String,
    pub amount: f64,
    #[serde(default)]
    pub unit: LineUnit,
    pub depth: usize,
    #[serde(default)]
    pub children: Vec<StatementLine>,
}

impl StatementLine {
    pub fn money(label: impl Into<String>, amount: f64) -> Self {
        Self {
            label: label.into(),
            amount,
            unit: LineUnit::Money,
            depth: 0,
            children: Vec::new(),
        }
    }

    pub fn percent(label: impl Into<String>, amount: f64) -> Self {
        Self {
            unit: LineUnit::Percent,
            ..Self::money(label, amount)
        }
    }

    pub fn with_children(mut self, children: Vec<StatementLine>) -> Self {
        self.children = children;
        self.set_depth(self.depth);
        self
    }

    /// Builds a line whose children are one money line per category.
    pub fn breakdown(label: impl Into<String>, amount: f64, items: &[CategoryAmount]) -> Self {
        let children = items
            .iter()
            .map(|item| StatementLine::money(item.category.clone(), item.amount))
            .collect();
        Self::money(label, amount).with_children(children)
    }

    fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
        for child in &mut self.children {
            child.set_depth(depth + 1);
        }
    }

    pub fn child(&self, label: &str) -> Option<&StatementLine> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Follows `path` down from this line, matching child labels.
    pub fn find(&self, path: &[&str]) -> Option<&StatementLine> {
        path.iter()
            .try_fold(self, |line, label| line.child(label))
    }

    /// Pre-order walk of the tree, this line first.
    pub fn flatten(&self) -> Vec<&StatementLine> {
        let mut lines = vec![self];
        for child in &self.children {
            lines.extend(child.flatten());
        }
        lines
    }

    fn formatted_amount(&self) -> String {
        match self.unit {
            LineUnit::Money => format!("{:.2}", self.amount),
            LineUnit::Percent => format!("{:.2}%", self.amount),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Depth,Label,Amount,Unit\n");

        for line in self.flatten() {
            let unit = match line.unit {
                LineUnit::Money => "money",
                LineUnit::Percent => "percent",
            };
            output.push_str(&format!(
                "{},\"{}\",{:.2},{}\n",
                line.depth,
                line.label.replace('"', "\"\""),
                line.amount,
                unit
            ));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("# {}: {}\n\n", self.label, self.formatted_amount()));

        for line in self.flatten().into_iter().skip(1) {
            let indent = "  ".repeat(line.depth.saturating_sub(1));
            output.push_str(&format!(
                "{}- {}: {}\n",
                indent,
                line.label,
                line.formatted_amount()
            ));
        }

        output
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: f64,
}

/// Per-category running totals in insertion order. Labels are matched
/// case-insensitively so records fold into the taxonomy's spelling.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CategoryTotals {
    items: IndexMap<String, CategoryAmount>,
}

impl CategoryTotals {
    pub(crate) fn seeded(labels: &[String]) -> Self {
        let mut totals = Self::default();
        for label in labels {
            totals.add(label, 0.0);
        }
        totals
    }

    pub(crate) fn add(&mut self, category: &str, amount: f64) {
        self.items
            .entry(label_key(category))
            .or_insert_with(|| CategoryAmount {
                category: category.trim().to_string(),
                amount: 0.0,
            })
            .amount += amount;
    }

    pub(crate) fn total(&self) -> f64 {
        self.items.values().map(|i| i.amount).sum()
    }

    pub(crate) fn into_vec(self) -> Vec<CategoryAmount> {
        self.items.into_values().collect()
    }
}
