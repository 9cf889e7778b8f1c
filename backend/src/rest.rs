use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use shared::{
    CreateExpenseRequest, CreateUserRequest, ErrorBody, ReportResponse, UpdateExpenseRequest,
    UpdateUserRequest,
};
use tracing::info;

use crate::db::DbConnection;
use crate::report::ReportService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub reports: ReportService,
}

impl AppState {
    pub fn new(db: DbConnection, reports: ReportService) -> Self {
        Self { db, reports }
    }
}

fn not_found(message: &str) -> axum::response::Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new(message))).into_response()
}

fn bad_request(message: String) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response()
}

fn internal_error(e: anyhow::Error) -> axum::response::Response {
    tracing::error!("Unexpected error: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("Internal server error")),
    )
        .into_response()
}

/// Axum handler for GET /users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /users/{}", user_id);

    match state.db.get_user(&user_id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => not_found("User not found"),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> impl IntoResponse {
    info!("POST /users - userId: {:?}", request.user_id);

    let user = match request.into_user(Utc::now().to_rfc3339()) {
        Ok(user) => user,
        Err(e) => return bad_request(e.to_string()),
    };

    match state.db.get_user(&user.user_id).await {
        Ok(Some(_)) => {
            return (StatusCode::CONFLICT, Json(ErrorBody::new("User already exists")))
                .into_response()
        }
        Ok(None) => {}
        Err(e) => return internal_error(e),
    }

    match state.db.put_user(&user).await {
        Ok(()) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for PUT /users/:user_id
///
/// Partial update: only the monthly budget is honored.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    info!("PUT /users/{} - budget: {:?}", user_id, request.monthly_budget);

    if let Err(e) = request.validate() {
        return bad_request(e.to_string());
    }

    let mut user = match state.db.get_user(&user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return not_found("User not found"),
        Err(e) => return internal_error(e),
    };

    if let Some(budget) = request.monthly_budget {
        user.monthly_budget = budget;
    }

    match state.db.put_user(&user).await {
        Ok(()) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for GET /expenses/:expense_id
pub async fn get_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /expenses/{}", expense_id);

    match state.db.get_expense(&expense_id).await {
        Ok(Some(expense)) => (StatusCode::OK, Json(expense)).into_response(),
        Ok(None) => not_found("Expense not found"),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for GET /expenses/user/:user_id
pub async fn list_user_expenses(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /expenses/user/{}", user_id);

    match state.db.list_expenses_by_user(&user_id).await {
        Ok(expenses) => (StatusCode::OK, Json(expenses)).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for POST /expenses
pub async fn create_expense(
    State(state): State<AppState>,
    Json(request): Json<CreateExpenseRequest>,
) -> impl IntoResponse {
    info!("POST /expenses - expenseId: {:?}", request.expense_id);

    let expense = match request.into_expense() {
        Ok(expense) => expense,
        Err(e) => return bad_request(e.to_string()),
    };

    match state.db.put_expense(&expense).await {
        Ok(()) => (StatusCode::CREATED, Json(expense)).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for PUT /expenses/:expense_id
pub async fn update_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<String>,
    Json(request): Json<UpdateExpenseRequest>,
) -> impl IntoResponse {
    info!("PUT /expenses/{}", expense_id);

    if let Err(e) = request.validate() {
        return bad_request(e.to_string());
    }

    let mut expense = match state.db.get_expense(&expense_id).await {
        Ok(Some(expense)) => expense,
        Ok(None) => return not_found("Expense not found"),
        Err(e) => return internal_error(e),
    };

    // Ownership check: the caller identifies itself via userId in the body
    if let Some(caller) = &request.user_id {
        if *caller != expense.user_id {
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorBody::new("Not authorized to update this expense")),
            )
                .into_response();
        }
    }

    if let Err(e) = request.apply_to(&mut expense) {
        return bad_request(e.to_string());
    }

    match state.db.put_expense(&expense).await {
        Ok(()) => (StatusCode::OK, Json(expense)).into_response(),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for DELETE /expenses/:expense_id
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /expenses/{}", expense_id);

    match state.db.delete_expense(&expense_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("Expense not found"),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for GET /reports/:user_id
pub async fn generate_report(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /reports/{}", user_id);

    match state.reports.generate(&state.db, &user_id).await {
        Ok(Some(url)) => (StatusCode::OK, Json(ReportResponse { url })).into_response(),
        Ok(None) => not_found("No expenses found for this user"),
        Err(e) => internal_error(e),
    }
}

/// Axum handler for GET /reports/download/:token
pub async fn download_report(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> impl IntoResponse {
    info!("GET /reports/download/{}", token);

    match state.reports.open(&token) {
        Some((filename, content)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            content,
        )
            .into_response(),
        None => not_found("Report not found or expired"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;
    use shared::{Category, Expense, User};
    use tempfile::TempDir;

    async fn setup_test_state() -> (AppState, TempDir) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let reports = ReportService::new(temp_dir.path());
        (AppState::new(db, reports), temp_dir)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        serde_json::from_slice(&bytes).expect("Failed to parse body")
    }

    fn user_request(user_id: &str) -> CreateUserRequest {
        CreateUserRequest {
            user_id: Some(user_id.to_string()),
            email: Some(format!("{}@example.com", user_id)),
            monthly_budget: None,
            created_at: None,
        }
    }

    fn expense_request(expense_id: &str, user_id: &str, amount: f64) -> CreateExpenseRequest {
        CreateExpenseRequest {
            expense_id: Some(expense_id.to_string()),
            user_id: Some(user_id.to_string()),
            amount: Some(amount),
            category: Some(Category::Food),
            date: Some("2025-06-10".to_string()),
            description: Some("lunch".to_string()),
        }
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let (state, _dir) = setup_test_state().await;

        let response = get_user(State(state), Path("missing".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.message, "User not found");
    }

    #[tokio::test]
    async fn test_create_then_get_user() {
        let (state, _dir) = setup_test_state().await;

        let response = create_user(State(state.clone()), Json(user_request("u-1")))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let created: User = body_json(response).await;
        assert_eq!(created.monthly_budget, 0.0);

        let response = get_user(State(state), Path("u-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let fetched: User = body_json(response).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_user_missing_email_is_bad_request() {
        let (state, _dir) = setup_test_state().await;

        let mut request = user_request("u-1");
        request.email = None;

        let response = create_user(State(state), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_user_twice_conflicts() {
        let (state, _dir) = setup_test_state().await;

        let first = create_user(State(state.clone()), Json(user_request("u-1")))
            .await
            .into_response();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = create_user(State(state), Json(user_request("u-1")))
            .await
            .into_response();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_user_budget() {
        let (state, _dir) = setup_test_state().await;
        create_user(State(state.clone()), Json(user_request("u-1"))).await;

        let response = update_user(
            State(state.clone()),
            Path("u-1".to_string()),
            Json(UpdateUserRequest {
                monthly_budget: Some(1500.0),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let updated: User = body_json(response).await;
        assert_eq!(updated.monthly_budget, 1500.0);

        // persisted, not just echoed
        let fetched = state.db.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(fetched.monthly_budget, 1500.0);
    }

    #[tokio::test]
    async fn test_update_user_absent_is_not_found() {
        let (state, _dir) = setup_test_state().await;

        let response = update_user(
            State(state),
            Path("missing".to_string()),
            Json(UpdateUserRequest {
                monthly_budget: Some(100.0),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_user_negative_budget_rejected() {
        let (state, _dir) = setup_test_state().await;
        create_user(State(state.clone()), Json(user_request("u-1"))).await;

        let response = update_user(
            State(state),
            Path("u-1".to_string()),
            Json(UpdateUserRequest {
                monthly_budget: Some(-5.0),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_expense_and_list_by_owner() {
        let (state, _dir) = setup_test_state().await;

        let response = create_expense(State(state.clone()), Json(expense_request("e-1", "u-1", 30.0)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        create_expense(State(state.clone()), Json(expense_request("e-2", "u-2", 99.0))).await;

        let response = list_user_expenses(State(state), Path("u-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let listed: Vec<Expense> = body_json(response).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].expense_id, "e-1");
    }

    #[tokio::test]
    async fn test_create_expense_zero_amount_rejected() {
        let (state, _dir) = setup_test_state().await;

        let response = create_expense(State(state), Json(expense_request("e-1", "u-1", 0.0)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_expense_paths() {
        let (state, _dir) = setup_test_state().await;

        let response = get_expense(State(state.clone()), Path("e-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        create_expense(State(state.clone()), Json(expense_request("e-1", "u-1", 30.0))).await;

        let response = get_expense(State(state), Path("e-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_expense_owner_mismatch_is_forbidden() {
        let (state, _dir) = setup_test_state().await;
        create_expense(State(state.clone()), Json(expense_request("e-1", "u-1", 30.0))).await;

        let response = update_expense(
            State(state.clone()),
            Path("e-1".to_string()),
            Json(UpdateExpenseRequest {
                user_id: Some("intruder".to_string()),
                amount: Some(1.0),
                ..Default::default()
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // record unchanged
        let stored = state.db.get_expense("e-1").await.unwrap().unwrap();
        assert_eq!(stored.amount, 30.0);
    }

    #[tokio::test]
    async fn test_update_expense_mutates_allowed_fields() {
        let (state, _dir) = setup_test_state().await;
        create_expense(State(state.clone()), Json(expense_request("e-1", "u-1", 30.0))).await;

        let response = update_expense(
            State(state),
            Path("e-1".to_string()),
            Json(UpdateExpenseRequest {
                user_id: Some("u-1".to_string()),
                amount: Some(45.0),
                category: Some(Category::Travel),
                ..Default::default()
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let updated: Expense = body_json(response).await;
        assert_eq!(updated.amount, 45.0);
        assert_eq!(updated.category, Category::Travel);
        assert_eq!(updated.user_id, "u-1");
    }

    #[tokio::test]
    async fn test_update_expense_absent_is_not_found() {
        let (state, _dir) = setup_test_state().await;

        let response = update_expense(
            State(state),
            Path("missing".to_string()),
            Json(UpdateExpenseRequest::default()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_expense_paths() {
        let (state, _dir) = setup_test_state().await;
        create_expense(State(state.clone()), Json(expense_request("e-1", "u-1", 30.0))).await;

        let response = delete_expense(State(state.clone()), Path("e-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = delete_expense(State(state), Path("e-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_report_requires_expenses() {
        let (state, _dir) = setup_test_state().await;

        let response = generate_report(State(state), Path("u-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_report_generate_then_download() {
        let (state, _dir) = setup_test_state().await;
        create_expense(State(state.clone()), Json(expense_request("e-1", "u-1", 30.0))).await;

        let response = generate_report(State(state.clone()), Path("u-1".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let report: ReportResponse = body_json(response).await;
        let token = report.url.rsplit('/').next().unwrap().to_string();

        let response = download_report(State(state), Path(token)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv"
        );
    }

    #[tokio::test]
    async fn test_download_unknown_token() {
        let (state, _dir) = setup_test_state().await;

        let response = download_report(State(state), Path("bogus".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
