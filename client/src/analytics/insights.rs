//! Rule-based spending insights.
//!
//! The rules run in a fixed order so the output is deterministic for a
//! given expense list, budget and day. Every threshold lives in
//! `InsightConfig` rather than inline.

use chrono::{Datelike, NaiveDate, Weekday};
use shared::{Category, Expense};

use super::summary::{category_summary, daily_spending, total_spent, TrendWindow};

/// Severity/sentiment tag for an insight card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    Info,
    Warning,
    Success,
}

/// A short, rule-generated observation about spending behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
}

impl Insight {
    fn info(title: &str, description: String) -> Self {
        Self {
            kind: InsightKind::Info,
            title: title.to_string(),
            description,
        }
    }

    fn warning(title: &str, description: String) -> Self {
        Self {
            kind: InsightKind::Warning,
            title: title.to_string(),
            description,
        }
    }

    fn success(title: &str, description: String) -> Self {
        Self {
            kind: InsightKind::Success,
            title: title.to_string(),
            description,
        }
    }
}

/// Thresholds for the insight rules. Overridable; the defaults are the
/// tuning the dashboard ships with.
#[derive(Debug, Clone)]
pub struct InsightConfig {
    /// Budget usage above this percentage is a warning
    pub budget_warning_pct: f64,
    /// Budget usage above this percentage (up to the warning tier) is
    /// informational; at or below it is a success
    pub budget_caution_pct: f64,
    /// Top-category share above this fires the concentration warning
    pub concentration_pct: u32,
    /// Top category must exceed this multiple of the runner-up to count
    /// as dominant
    pub dominance_factor: f64,
    /// Share threshold for the food-specific advice
    pub food_share_pct: u32,
    /// Combined share threshold for the non-essential warning
    pub non_essential_pct: u32,
    /// Which categories count as non-essential
    pub non_essential: Vec<Category>,
    /// Weekend-to-weekday average spend ratio that triggers the warning
    pub weekend_ratio: f64,
    /// Minimum zero-spend day streak worth celebrating
    pub min_zero_streak: usize,
    /// Categories above this share feed the savings estimate
    pub savings_share_pct: u32,
    /// Assumed achievable reduction for those categories
    pub savings_reduction: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            budget_warning_pct: 90.0,
            budget_caution_pct: 70.0,
            concentration_pct: 50,
            dominance_factor: 2.0,
            food_share_pct: 30,
            non_essential_pct: 40,
            non_essential: vec![Category::Entertainment, Category::Clothing, Category::Other],
            weekend_ratio: 1.5,
            min_zero_streak: 2,
            savings_share_pct: 20,
            savings_reduction: 0.10,
        }
    }
}

/// Evaluate every rule over the expense list.
///
/// With no expenses at all, emits exactly one welcome insight and skips
/// the rest. With a zero (unset) budget the budget-usage tiers stay
/// silent but every other rule still runs.
pub fn generate_insights(
    expenses: &[Expense],
    monthly_budget: f64,
    today: NaiveDate,
    config: &InsightConfig,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if expenses.is_empty() {
        insights.push(Insight::info(
            "Welcome",
            "Add your first expense to start seeing spending insights.".to_string(),
        ));
        return insights;
    }

    let total = total_spent(expenses);
    let summary = category_summary(expenses);
    let daily = daily_spending(expenses, today, TrendWindow::Month);

    // Budget usage tiers: exactly one fires when a budget is set.
    if monthly_budget > 0.0 {
        let used_pct = total / monthly_budget * 100.0;
        if used_pct > config.budget_warning_pct {
            insights.push(Insight::warning(
                "Budget Alert",
                format!(
                    "You've used {:.0}% of your monthly budget. Consider reducing expenses for the rest of the month.",
                    used_pct
                ),
            ));
        } else if used_pct > config.budget_caution_pct {
            insights.push(Insight::info(
                "Budget Status",
                format!(
                    "You've used {:.0}% of your monthly budget. You're on track but be mindful of your spending.",
                    used_pct
                ),
            ));
        } else {
            insights.push(Insight::success(
                "Budget On Track",
                format!(
                    "You've only used {:.0}% of your monthly budget. You're doing great!",
                    used_pct
                ),
            ));
        }
    }

    // Pace projection: recent daily average extrapolated over a month.
    let last_week = &daily[daily.len() - 7..];
    let average_daily = last_week.iter().map(|d| d.amount).sum::<f64>() / 7.0;
    if monthly_budget > 0.0 && average_daily > 0.0 && average_daily * 30.0 > monthly_budget {
        insights.push(Insight::warning(
            "Spending Trend",
            "Based on your recent spending, you're on track to exceed your monthly budget. Try to reduce daily expenses.".to_string(),
        ));
    }

    // Concentration of spending in the top category.
    if let Some(top) = summary.first() {
        if top.percentage > config.concentration_pct {
            insights.push(Insight::warning(
                "Spending Concentration",
                format!(
                    "{}% of your spending is on {}. Consider diversifying your expenses.",
                    top.percentage, top.category
                ),
            ));
        }
    }

    // Dominance over the runner-up category.
    if summary.len() >= 2 {
        let top = &summary[0];
        let second = &summary[1];
        if second.percentage > 0
            && top.percentage as f64 > config.dominance_factor * second.percentage as f64
        {
            insights.push(Insight::info(
                "Dominant Category",
                format!(
                    "{} takes {}% of your spending, more than double {} at {}%.",
                    top.category, top.percentage, second.category, second.percentage
                ),
            ));
        }
    }

    // Food-specific advice.
    if let Some(food) = summary.iter().find(|s| s.category == Category::Food) {
        if food.percentage > config.food_share_pct {
            insights.push(Insight::info(
                "Food Expenses",
                format!(
                    "You're spending {}% of your budget on food. Consider meal planning to reduce costs.",
                    food.percentage
                ),
            ));
        }
    }

    // Non-essential category share.
    let non_essential_amount: f64 = summary
        .iter()
        .filter(|s| config.non_essential.contains(&s.category))
        .map(|s| s.amount)
        .sum();
    if total > 0.0 {
        let non_essential_pct = non_essential_amount / total * 100.0;
        if non_essential_pct > config.non_essential_pct as f64 {
            insights.push(Insight::warning(
                "Non-Essential Spending",
                format!(
                    "{:.0}% of your spending went to non-essential categories. Tightening these could stretch your budget further.",
                    non_essential_pct
                ),
            ));
        }
    }

    // Weekend vs weekday average daily spend.
    let mut weekend_total = 0.0;
    let mut weekend_days = 0u32;
    let mut weekday_total = 0.0;
    let mut weekday_days = 0u32;
    for day in &daily {
        match day.date.weekday() {
            Weekday::Sat | Weekday::Sun => {
                weekend_total += day.amount;
                weekend_days += 1;
            }
            _ => {
                weekday_total += day.amount;
                weekday_days += 1;
            }
        }
    }
    if weekend_days > 0 && weekday_days > 0 {
        let weekend_average = weekend_total / weekend_days as f64;
        let weekday_average = weekday_total / weekday_days as f64;
        if weekday_average > 0.0 && weekend_average / weekday_average > config.weekend_ratio {
            insights.push(Insight::warning(
                "Weekend Spending",
                format!(
                    "Your average weekend day costs {:.1}x a weekday. Weekends are driving your spending.",
                    weekend_average / weekday_average
                ),
            ));
        }
    }

    // Daily variance over the trailing week.
    let mean = average_daily;
    if mean > 0.0 {
        let variance = last_week
            .iter()
            .map(|d| (d.amount - mean) * (d.amount - mean))
            .sum::<f64>()
            / 7.0;
        if variance > mean * mean {
            insights.push(Insight::info(
                "Inconsistent Spending",
                "Your daily spending over the last week swings well beyond its average. A steadier pace makes budgets easier to hold.".to_string(),
            ));
        }
    }

    // Longest zero-spend streak in the window.
    let mut longest_streak = 0usize;
    let mut current_streak = 0usize;
    for day in &daily {
        if day.amount == 0.0 {
            current_streak += 1;
            longest_streak = longest_streak.max(current_streak);
        } else {
            current_streak = 0;
        }
    }
    if longest_streak >= config.min_zero_streak {
        insights.push(Insight::success(
            "No-Spend Streak",
            format!(
                "You went {} consecutive days without spending this month. Nice discipline!",
                longest_streak
            ),
        ));
    }

    // Potential savings across heavyweight categories.
    let potential_savings: f64 = summary
        .iter()
        .filter(|s| s.percentage > config.savings_share_pct)
        .map(|s| s.amount * config.savings_reduction)
        .sum();
    if potential_savings > 0.0 {
        insights.push(Insight::success(
            "Potential Savings",
            format!(
                "Trimming your biggest categories by {:.0}% could save \u{20b9}{:.0} a month.",
                config.savings_reduction * 100.0,
                potential_savings
            ),
        ));
    }

    insights
}
