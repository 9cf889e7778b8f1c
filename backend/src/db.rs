use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use shared::{Category, Expense, User};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use std::sync::Arc;

// The database URL for the production database
const DATABASE_URL: &str = "sqlite:expense-compass.db";

/// DbConnection manages the record-store tables.
///
/// Both tables are plain key-value-by-id; `idx_expenses_user_id` is the
/// secondary index that serves lookup-by-owner.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize the standard database
    pub async fn init() -> Result<Self> {
        Self::new(DATABASE_URL).await
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                monthly_budget REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS expenses (
                expense_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_expenses_user_id ON expenses (user_id)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &*self.pool
    }

    /// Store a user record, overwriting any existing record with the same id.
    pub async fn put_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO users (user_id, email, monthly_budget, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&user.user_id)
        .bind(&user.email)
        .bind(user.monthly_budget)
        .bind(&user.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Retrieve a user by id
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT user_id, email, monthly_budget, created_at FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(User {
                user_id: r.get("user_id"),
                email: r.get("email"),
                monthly_budget: r.get("monthly_budget"),
                created_at: r.get("created_at"),
            })),
            None => Ok(None),
        }
    }

    /// Store an expense record, overwriting any existing record with the
    /// same id (last write wins).
    pub async fn put_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO expenses (expense_id, user_id, amount, category, date, description) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&expense.expense_id)
        .bind(&expense.user_id)
        .bind(expense.amount)
        .bind(expense.category.label())
        .bind(expense.date.to_string())
        .bind(&expense.description)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Retrieve an expense by id
    pub async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>> {
        let row = sqlx::query(
            "SELECT expense_id, user_id, amount, category, date, description \
             FROM expenses WHERE expense_id = ?",
        )
        .bind(expense_id)
        .fetch_optional(&*self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(Self::expense_from_row(&r)?)),
            None => Ok(None),
        }
    }

    /// List all expenses owned by a user, oldest first.
    pub async fn list_expenses_by_user(&self, user_id: &str) -> Result<Vec<Expense>> {
        let rows = sqlx::query(
            "SELECT expense_id, user_id, amount, category, date, description \
             FROM expenses WHERE user_id = ? ORDER BY date, expense_id",
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(Self::expense_from_row).collect()
    }

    /// Delete an expense by id. Returns false when no such record exists.
    pub async fn delete_expense(&self, expense_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE expense_id = ?")
            .bind(expense_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn expense_from_row(r: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let category_label: String = r.get("category");
        let category = Category::from_label(&category_label)
            .ok_or_else(|| anyhow!("Unknown category in store: {}", category_label))?;
        let date_text: String = r.get("date");
        let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d")
            .map_err(|e| anyhow!("Bad date in store ({}): {}", date_text, e))?;

        Ok(Expense {
            expense_id: r.get("expense_id"),
            user_id: r.get("user_id"),
            amount: r.get("amount"),
            category,
            date,
            description: r.get("description"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test() -> DbConnection {
        DbConnection::init_test().await.expect("Failed to create test database")
    }

    fn sample_user(user_id: &str) -> User {
        User {
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            monthly_budget: 500.0,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn sample_expense(expense_id: &str, user_id: &str, amount: f64) -> Expense {
        Expense {
            expense_id: expense_id.to_string(),
            user_id: user_id.to_string(),
            amount,
            category: Category::Food,
            date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            description: Some("lunch".to_string()),
        }
    }

    #[tokio::test]
    async fn test_put_and_get_user() {
        let db = setup_test().await;
        let user = sample_user("u-1");

        db.put_user(&user).await.expect("Failed to put user");

        let stored = db.get_user("u-1").await.expect("Failed to get user");
        assert_eq!(stored, Some(user));
    }

    #[tokio::test]
    async fn test_get_nonexistent_user() {
        let db = setup_test().await;

        let result = db.get_user("missing").await.expect("Query failed");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_user_replaces_existing() {
        let db = setup_test().await;
        let mut user = sample_user("u-1");

        db.put_user(&user).await.expect("Failed to put user");

        user.monthly_budget = 1200.0;
        db.put_user(&user).await.expect("Failed to update user");

        let stored = db.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(stored.monthly_budget, 1200.0);
    }

    #[tokio::test]
    async fn test_put_and_get_expense_round_trip() {
        let db = setup_test().await;
        let expense = sample_expense("e-1", "u-1", 42.5);

        db.put_expense(&expense).await.expect("Failed to put expense");

        let stored = db.get_expense("e-1").await.expect("Failed to get expense");
        assert_eq!(stored, Some(expense));
    }

    #[tokio::test]
    async fn test_list_expenses_uses_owner_index() {
        let db = setup_test().await;

        db.put_expense(&sample_expense("e-1", "u-1", 10.0)).await.unwrap();
        db.put_expense(&sample_expense("e-2", "u-1", 20.0)).await.unwrap();
        db.put_expense(&sample_expense("e-3", "u-2", 30.0)).await.unwrap();

        let listed = db.list_expenses_by_user("u-1").await.expect("Failed to list");
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|e| e.user_id == "u-1"));

        let empty = db.list_expenses_by_user("nobody").await.expect("Failed to list");
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_list_expenses_ordered_by_date() {
        let db = setup_test().await;

        let mut early = sample_expense("e-early", "u-1", 10.0);
        early.date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut late = sample_expense("e-late", "u-1", 20.0);
        late.date = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();

        db.put_expense(&late).await.unwrap();
        db.put_expense(&early).await.unwrap();

        let listed = db.list_expenses_by_user("u-1").await.unwrap();
        assert_eq!(listed[0].expense_id, "e-early");
        assert_eq!(listed[1].expense_id, "e-late");
    }

    #[tokio::test]
    async fn test_delete_expense() {
        let db = setup_test().await;
        db.put_expense(&sample_expense("e-1", "u-1", 10.0)).await.unwrap();

        let deleted = db.delete_expense("e-1").await.expect("Failed to delete");
        assert!(deleted);

        let gone = db.get_expense("e-1").await.unwrap();
        assert!(gone.is_none());

        // deleting again reports not-found
        let deleted_again = db.delete_expense("e-1").await.unwrap();
        assert!(!deleted_again);
    }
}
