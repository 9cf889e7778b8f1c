//! Aggregation engine: pure, deterministic transformations of an expense
//! list into the derived views the dashboard renders.
//!
//! Nothing in here touches the cache, the network or the clock - callers
//! pass "today" in - so every function recomputes the same output for the
//! same input.

pub mod insights;
pub mod summary;

pub use insights::{generate_insights, Insight, InsightConfig, InsightKind};
pub use summary::{
    category_summary, daily_spending, remaining_budget, total_spent, weekly_trend,
    CategorySummary, DailySpend, TrendComparison, TrendWindow,
};
