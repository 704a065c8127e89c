//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    account::{
        bootstrap_endpoint, create_account_endpoint, delete_account_endpoint,
        edit_account_endpoint, get_accounts_endpoint,
    },
    dashboard::get_summary_endpoint,
    debt::{create_debt_endpoint, delete_debt_endpoint, edit_debt_endpoint, get_debts_endpoint},
    endpoints,
    transaction::{
        create_deposit_endpoint, create_withdrawal_endpoint, get_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::BOOTSTRAP, post(bootstrap_endpoint))
        .route(endpoints::ACCOUNTS, get(get_accounts_endpoint))
        .route(endpoints::ACCOUNTS, post(create_account_endpoint))
        .route(endpoints::ACCOUNT, put(edit_account_endpoint))
        .route(endpoints::ACCOUNT, delete(delete_account_endpoint))
        .route(endpoints::DEBTS, get(get_debts_endpoint))
        .route(endpoints::DEBTS, post(create_debt_endpoint))
        .route(endpoints::DEBT, put(edit_debt_endpoint))
        .route(endpoints::DEBT, delete(delete_debt_endpoint))
        .route(endpoints::DEPOSITS, post(create_deposit_endpoint))
        .route(endpoints::WITHDRAWALS, post(create_withdrawal_endpoint))
        .route(endpoints::TRANSACTIONS, get(get_transactions_endpoint))
        .route(endpoints::SUMMARY, get(get_summary_endpoint))
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "not_found", "message": "no such route"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router, endpoints, identity::USER_ID_HEADER};

    fn test_server() -> TestServer {
        let state = AppState::new(Connection::open_in_memory().unwrap()).unwrap();
        TestServer::new(build_router(state)).unwrap()
    }

    #[tokio::test]
    async fn unknown_routes_get_a_json_404() {
        let server = test_server();

        let response = server.get("/api/nope").await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn every_api_route_requires_identity() {
        let server = test_server();

        for route in [
            endpoints::ACCOUNTS,
            endpoints::DEBTS,
            endpoints::TRANSACTIONS,
            endpoints::SUMMARY,
        ] {
            let response = server.get(route).await;
            response.assert_status_unauthorized();
        }
    }

    #[tokio::test]
    async fn routes_are_wired_up() {
        let server = test_server();

        let response = server
            .get(endpoints::ACCOUNTS)
            .add_header(USER_ID_HEADER, "user-1")
            .await;

        response.assert_status_ok();
    }

    /// Borrow money, spend some of it, pay the loan down, then check the
    /// dashboard reflects every step.
    #[tokio::test]
    async fn loan_lifecycle_over_http() {
        let server = test_server();
        let response = server
            .post(endpoints::BOOTSTRAP)
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        let cash: Value = response.json();

        let response = server
            .post(endpoints::DEPOSITS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "account_id": cash["id"],
                "amount": 10000.0,
                "description": "Car loan",
                "source": "loan",
                "debt_name": "Car Loan"
            }))
            .await;
        let deposit: Value = response.json();
        let debt_id = deposit["debt_id"].as_i64().unwrap();

        server
            .post(endpoints::WITHDRAWALS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "account_id": cash["id"],
                "amount": 7000.0,
                "description": "Car down payment",
                "category": "transport"
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(endpoints::WITHDRAWALS)
            .add_header(USER_ID_HEADER, "user-1")
            .json(&json!({
                "account_id": cash["id"],
                "amount": 2000.0,
                "description": "Loan payment",
                "category": "debt_payment",
                "debt_id": debt_id
            }))
            .await;
        let payment: Value = response.json();
        assert_eq!(payment["account_balance"], 1000.0);
        assert_eq!(payment["debt_balance"], 8000.0);

        let response = server
            .get(endpoints::SUMMARY)
            .add_header(USER_ID_HEADER, "user-1")
            .await;
        let summary: Value = response.json();
        assert_eq!(summary["total_balance"], 1000.0);
        assert_eq!(summary["month_in"], 10000.0);
        assert_eq!(summary["month_out"], 9000.0);
        assert_eq!(summary["total_debt"], 8000.0);
        assert_eq!(summary["recent_transactions"].as_array().unwrap().len(), 3);
    }
}
