//! On-device mirror of the record store.
//!
//! The cache is the read-of-record for the UI: every operation hits it
//! first and the remote store catches up in the background. It is an
//! explicitly constructed component - created at app start, cleared on
//! logout - rather than ambient module state, so tests and embedders
//! control its lifecycle.

use shared::{Expense, User};
use std::collections::HashMap;
use std::sync::RwLock;

/// Keyed mirror of user records and per-owner expense lists.
///
/// `get_expenses` distinguishes "never populated" (None) from "known
/// empty" (Some of an empty vec); the sync layer's cold-read path depends
/// on that distinction.
#[derive(Default)]
pub struct LocalCache {
    users: RwLock<HashMap<String, User>>,
    expenses: RwLock<HashMap<String, Vec<Expense>>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.read().expect("cache lock poisoned").get(user_id).cloned()
    }

    pub fn put_user(&self, user: User) {
        self.users
            .write()
            .expect("cache lock poisoned")
            .insert(user.user_id.clone(), user);
    }

    pub fn get_expenses(&self, user_id: &str) -> Option<Vec<Expense>> {
        self.expenses
            .read()
            .expect("cache lock poisoned")
            .get(user_id)
            .cloned()
    }

    /// Replace the whole expense list for an owner (remote refresh path).
    pub fn put_expenses(&self, user_id: &str, expenses: Vec<Expense>) {
        self.expenses
            .write()
            .expect("cache lock poisoned")
            .insert(user_id.to_string(), expenses);
    }

    /// Append a single expense, creating the owner's list if needed.
    pub fn push_expense(&self, expense: Expense) {
        self.expenses
            .write()
            .expect("cache lock poisoned")
            .entry(expense.user_id.clone())
            .or_default()
            .push(expense);
    }

    /// Replace a cached expense in place. Returns false when the record
    /// is not cached.
    pub fn update_expense(&self, expense: &Expense) -> bool {
        let mut expenses = self.expenses.write().expect("cache lock poisoned");
        match expenses.get_mut(&expense.user_id) {
            Some(list) => match list.iter_mut().find(|e| e.expense_id == expense.expense_id) {
                Some(slot) => {
                    *slot = expense.clone();
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Drop an expense from the owner's cached list. Returns false when
    /// it was not cached.
    pub fn remove_expense(&self, user_id: &str, expense_id: &str) -> bool {
        let mut expenses = self.expenses.write().expect("cache lock poisoned");
        match expenses.get_mut(user_id) {
            Some(list) => {
                let before = list.len();
                list.retain(|e| e.expense_id != expense_id);
                list.len() < before
            }
            None => false,
        }
    }

    /// Logout lifecycle: forget everything cached for one user.
    pub fn clear_user(&self, user_id: &str) {
        self.users.write().expect("cache lock poisoned").remove(user_id);
        self.expenses.write().expect("cache lock poisoned").remove(user_id);
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.users.write().expect("cache lock poisoned").clear();
        self.expenses.write().expect("cache lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::Category;

    fn expense(expense_id: &str, user_id: &str, amount: f64) -> Expense {
        Expense {
            expense_id: expense_id.to_string(),
            user_id: user_id.to_string(),
            amount,
            category: Category::Food,
            date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            description: None,
        }
    }

    fn user(user_id: &str) -> User {
        User {
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            monthly_budget: 0.0,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_user_round_trip() {
        let cache = LocalCache::new();
        assert!(cache.get_user("u-1").is_none());

        cache.put_user(user("u-1"));
        assert_eq!(cache.get_user("u-1").unwrap().user_id, "u-1");
    }

    #[test]
    fn test_cold_vs_known_empty_expense_list() {
        let cache = LocalCache::new();
        assert!(cache.get_expenses("u-1").is_none());

        cache.put_expenses("u-1", Vec::new());
        assert_eq!(cache.get_expenses("u-1"), Some(Vec::new()));
    }

    #[test]
    fn test_push_and_remove_expense() {
        let cache = LocalCache::new();
        cache.push_expense(expense("e-1", "u-1", 10.0));
        cache.push_expense(expense("e-2", "u-1", 20.0));

        assert_eq!(cache.get_expenses("u-1").unwrap().len(), 2);

        assert!(cache.remove_expense("u-1", "e-1"));
        let remaining = cache.get_expenses("u-1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].expense_id, "e-2");

        assert!(!cache.remove_expense("u-1", "e-1"));
        assert!(!cache.remove_expense("nobody", "e-2"));
    }

    #[test]
    fn test_update_expense_in_place() {
        let cache = LocalCache::new();
        cache.push_expense(expense("e-1", "u-1", 10.0));

        let mut updated = expense("e-1", "u-1", 99.0);
        updated.category = Category::Travel;
        assert!(cache.update_expense(&updated));

        let cached = cache.get_expenses("u-1").unwrap();
        assert_eq!(cached[0].amount, 99.0);
        assert_eq!(cached[0].category, Category::Travel);

        assert!(!cache.update_expense(&expense("missing", "u-1", 1.0)));
    }

    #[test]
    fn test_clear_user_drops_both_tables() {
        let cache = LocalCache::new();
        cache.put_user(user("u-1"));
        cache.put_user(user("u-2"));
        cache.push_expense(expense("e-1", "u-1", 10.0));

        cache.clear_user("u-1");

        assert!(cache.get_user("u-1").is_none());
        assert!(cache.get_expenses("u-1").is_none());
        assert!(cache.get_user("u-2").is_some());
    }
}
