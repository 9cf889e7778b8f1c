use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed expense category set.
///
/// Every expense carries exactly one of these tags; aggregation groups by
/// them. The set is closed on purpose - free-form categories would make
/// the category summaries and insight rules meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Travel,
    Rent,
    Stationery,
    Utilities,
    Entertainment,
    Clothing,
    Health,
    Education,
    Other,
}

impl Category {
    /// All categories, in display order.
    pub fn all() -> [Category; 10] {
        [
            Category::Food,
            Category::Travel,
            Category::Rent,
            Category::Stationery,
            Category::Utilities,
            Category::Entertainment,
            Category::Clothing,
            Category::Health,
            Category::Education,
            Category::Other,
        ]
    }

    /// Inverse of `label`; `None` for anything outside the fixed set.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::all().into_iter().find(|c| c.label() == label)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Travel => "Travel",
            Category::Rent => "Rent",
            Category::Stationery => "Stationery",
            Category::Utilities => "Utilities",
            Category::Entertainment => "Entertainment",
            Category::Clothing => "Clothing",
            Category::Health => "Health",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A tracked user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity-provider-derived identifier; unique across the system
    pub user_id: String,
    pub email: String,
    /// Monthly spending budget; always >= 0, 0 means "not set"
    pub monthly_budget: f64,
    /// RFC 3339 timestamp, immutable after creation
    pub created_at: String,
}

/// A single expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Generated at creation time, globally unique, never reused
    pub expense_id: String,
    /// Owning user; immutable after creation
    pub user_id: String,
    /// Always > 0
    pub amount: f64,
    pub category: Category,
    /// Calendar day only - no time-of-day semantics
    pub date: NaiveDate,
    pub description: Option<String>,
}

/// Validation failures for request payloads.
///
/// These are reported to the caller as user-facing messages and never
/// retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    MissingUserId,
    MissingEmail,
    MissingExpenseId,
    MissingAmount,
    MissingCategory,
    MissingDate,
    AmountNotPositive,
    NegativeBudget,
    InvalidDate(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingUserId => write!(f, "Missing required field: userId"),
            ValidationError::MissingEmail => write!(f, "Missing required field: email"),
            ValidationError::MissingExpenseId => write!(f, "Missing required field: expenseId"),
            ValidationError::MissingAmount => write!(f, "Missing required field: amount"),
            ValidationError::MissingCategory => write!(f, "Missing required field: category"),
            ValidationError::MissingDate => write!(f, "Missing required field: date"),
            ValidationError::AmountNotPositive => write!(f, "Amount must be greater than zero"),
            ValidationError::NegativeBudget => write!(f, "Monthly budget cannot be negative"),
            ValidationError::InvalidDate(raw) => write!(f, "Invalid date: {}", raw),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Normalize a date string to a calendar day.
///
/// Accepts either a plain `YYYY-MM-DD` day or an RFC 3339 timestamp; any
/// time-of-day component is discarded.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate, ValidationError> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    chrono::DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.date_naive())
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}

/// Body of `POST /users`. All fields optional at the wire level so a
/// missing field maps to a 400 with a named message instead of a
/// deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub monthly_budget: Option<f64>,
    pub created_at: Option<String>,
}

impl CreateUserRequest {
    /// Validate and build the full record, filling defaults the way the
    /// store does: budget 0, creation timestamp supplied by the caller.
    pub fn into_user(self, default_created_at: String) -> Result<User, ValidationError> {
        let user_id = match self.user_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ValidationError::MissingUserId),
        };
        let email = match self.email {
            Some(email) if !email.is_empty() => email,
            _ => return Err(ValidationError::MissingEmail),
        };
        let monthly_budget = self.monthly_budget.unwrap_or(0.0);
        if monthly_budget < 0.0 {
            return Err(ValidationError::NegativeBudget);
        }
        Ok(User {
            user_id,
            email,
            monthly_budget,
            created_at: self.created_at.unwrap_or(default_created_at),
        })
    }
}

/// Body of `PUT /users/{userId}`. A partial update: only `monthlyBudget`
/// is honored, anything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub monthly_budget: Option<f64>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.monthly_budget {
            Some(budget) if budget < 0.0 => Err(ValidationError::NegativeBudget),
            _ => Ok(()),
        }
    }
}

/// Body of `POST /expenses` - the full record including the generated id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateExpenseRequest {
    pub expense_id: Option<String>,
    pub user_id: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub date: Option<String>,
    pub description: Option<String>,
}

impl CreateExpenseRequest {
    pub fn into_expense(self) -> Result<Expense, ValidationError> {
        let expense_id = match self.expense_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ValidationError::MissingExpenseId),
        };
        let user_id = match self.user_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ValidationError::MissingUserId),
        };
        let amount = self.amount.ok_or(ValidationError::MissingAmount)?;
        if amount <= 0.0 {
            return Err(ValidationError::AmountNotPositive);
        }
        let category = self.category.ok_or(ValidationError::MissingCategory)?;
        let date = match self.date {
            Some(raw) => parse_calendar_date(&raw)?,
            None => return Err(ValidationError::MissingDate),
        };
        Ok(Expense {
            expense_id,
            user_id,
            amount,
            category,
            date,
            description: self.description,
        })
    }
}

/// Body of `PUT /expenses/{expenseId}`.
///
/// `user_id` identifies the caller for the ownership check; it is never
/// written. Only amount, category, date and description are mutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    pub user_id: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub date: Option<String>,
    pub description: Option<String>,
}

impl UpdateExpenseRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(amount) = self.amount {
            if amount <= 0.0 {
                return Err(ValidationError::AmountNotPositive);
            }
        }
        if let Some(raw) = &self.date {
            parse_calendar_date(raw)?;
        }
        Ok(())
    }

    /// Apply the mutable fields to an existing record. Id and owner are
    /// left untouched.
    pub fn apply_to(&self, expense: &mut Expense) -> Result<(), ValidationError> {
        if let Some(amount) = self.amount {
            if amount <= 0.0 {
                return Err(ValidationError::AmountNotPositive);
            }
            expense.amount = amount;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(raw) = &self.date {
            expense.date = parse_calendar_date(raw)?;
        }
        if let Some(description) = &self.description {
            expense.description = Some(description.clone());
        }
        Ok(())
    }
}

/// JSON error envelope: every error response carries a `message` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Success body of `GET /reports/{userId}`: a time-limited download URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub url: String,
}
