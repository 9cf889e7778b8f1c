//! Category totals, daily buckets and week-over-week trend.

use chrono::{Duration, NaiveDate};
use shared::{Category, Expense};
use std::collections::HashMap;

/// Per-category total with its share of overall spending.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: Category,
    pub amount: f64,
    /// Rounded share of `total_spent`, 0 when nothing is spent.
    pub percentage: u32,
}

/// One calendar-day bucket of the spending series.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Size of the trailing daily-spending window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendWindow {
    Week,
    Month,
}

impl TrendWindow {
    pub fn days(self) -> usize {
        match self {
            TrendWindow::Week => 7,
            TrendWindow::Month => 30,
        }
    }
}

/// Most recent 7 days measured against the 7 before them.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendComparison {
    pub recent_total: f64,
    pub previous_total: f64,
    /// None when the previous window has no spending - "no prior data"
    /// rather than an infinite percentage.
    pub percent_change: Option<f64>,
}

pub fn total_spent(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

pub fn remaining_budget(monthly_budget: f64, total_spent: f64) -> f64 {
    monthly_budget - total_spent
}

/// Group by category, sum, sort descending by sum.
///
/// The sort is stable and groups are seeded in first-encountered order,
/// so equal sums keep the order the categories first appeared in the
/// input list.
pub fn category_summary(expenses: &[Expense]) -> Vec<CategorySummary> {
    let mut order: Vec<Category> = Vec::new();
    let mut totals: HashMap<Category, f64> = HashMap::new();

    for expense in expenses {
        if !totals.contains_key(&expense.category) {
            order.push(expense.category);
        }
        *totals.entry(expense.category).or_insert(0.0) += expense.amount;
    }

    let total: f64 = totals.values().sum();

    let mut summary: Vec<CategorySummary> = order
        .into_iter()
        .map(|category| {
            let amount = totals[&category];
            let percentage = if total > 0.0 {
                (amount / total * 100.0).round() as u32
            } else {
                0
            };
            CategorySummary {
                category,
                amount,
                percentage,
            }
        })
        .collect();

    summary.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(std::cmp::Ordering::Equal));
    summary
}

/// Exactly N consecutive day buckets ending at `today`, each holding the
/// summed spend of that calendar day. Expenses outside the window are
/// ignored.
pub fn daily_spending(expenses: &[Expense], today: NaiveDate, window: TrendWindow) -> Vec<DailySpend> {
    let days = window.days();
    let start = today - Duration::days(days as i64 - 1);

    let mut buckets: Vec<DailySpend> = (0..days)
        .map(|i| DailySpend {
            date: start + Duration::days(i as i64),
            amount: 0.0,
        })
        .collect();

    for expense in expenses {
        if expense.date >= start && expense.date <= today {
            let index = (expense.date - start).num_days() as usize;
            buckets[index].amount += expense.amount;
        }
    }

    buckets
}

/// Compare the trailing 7 days against the 7 before them.
pub fn weekly_trend(expenses: &[Expense], today: NaiveDate) -> TrendComparison {
    let recent_start = today - Duration::days(6);
    let previous_start = today - Duration::days(13);

    let mut recent_total = 0.0;
    let mut previous_total = 0.0;
    for expense in expenses {
        if expense.date >= recent_start && expense.date <= today {
            recent_total += expense.amount;
        } else if expense.date >= previous_start && expense.date < recent_start {
            previous_total += expense.amount;
        }
    }

    let percent_change = if previous_total > 0.0 {
        Some((recent_total - previous_total) / previous_total * 100.0)
    } else {
        None
    };

    TrendComparison {
        recent_total,
        previous_total,
        percent_change,
    }
}
