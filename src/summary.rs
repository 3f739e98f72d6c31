//! Totals over a list of transactions for the overview screen.

use std::collections::HashMap;

use crate::Transaction;

/// Income, expenses and balance over a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LedgerSummary {
    /// The sum of all income.
    pub income: f64,
    /// The sum of all expenses as a positive number.
    pub expenses: f64,
    /// Income minus expenses.
    pub balance: f64,
}

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The category name.
    pub category: String,
    /// The total spent as a positive number.
    pub total: f64,
}

/// Sum income and expenses over `transactions`.
pub fn summarise(transactions: &[Transaction]) -> LedgerSummary {
    let mut summary = LedgerSummary::default();

    for transaction in transactions {
        if transaction.amount < 0.0 {
            summary.expenses -= transaction.amount;
        } else {
            summary.income += transaction.amount;
        }
    }

    summary.balance = summary.income - summary.expenses;
    summary
}

/// Sum expenses by category, largest total first.
///
/// Categories with equal totals are sorted by name. Income is ignored.
pub fn expenses_by_category(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.amount < 0.0) {
        *totals.entry(transaction.category.as_ref()).or_insert(0.0) -= transaction.amount;
    }

    let mut totals: Vec<_> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_owned(),
            total,
        })
        .collect();

    totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    totals
}
