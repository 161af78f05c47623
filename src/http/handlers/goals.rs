//! Goal endpoints for the authenticated user.

use std::collections::HashSet;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, error};
use utoipa::ToSchema;

use super::CurrentUser;
use crate::goals::{storage, GoalStatus, NewGoal};

/// A goal as rendered to clients, with its status computed against the
/// caller's reference date.
#[derive(Debug, Serialize, ToSchema)]
pub struct GoalView {
    pub title: String,
    pub status: &'static str,
    pub notes: String,
    pub start_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
}

#[utoipa::path(
    post,
    path = "/goals",
    request_body = Vec<NewGoal>,
    responses(
        (status = 201, description = "Goals created"),
        (status = 422, description = "Validation error", body = String),
        (status = 401, description = "Not logged in", body = String)
    ),
    tag = "goals"
)]
pub async fn create(
    pool: Extension<PgPool>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    payload: Option<Json<Vec<NewGoal>>>,
) -> impl IntoResponse {
    let Some(Json(goals)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string());
    };

    if goals.is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "No goals".to_string());
    }
    if goals.iter().any(|goal| goal.title.trim().is_empty()) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Goal does not have a title".to_string(),
        );
    }

    if let Err(err) = storage::insert_goals(&pool, &username, &goals).await {
        error!("Failed to insert goals: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error posting goals".to_string(),
        );
    }

    (StatusCode::CREATED, "OK".to_string())
}

#[utoipa::path(
    get,
    path = "/goals",
    responses(
        (status = 200, description = "Goals in range, filtered by status", body = [GoalView]),
        (status = 400, description = "Missing query parameter", body = String),
        (status = 422, description = "Malformed query parameter", body = String),
        (status = 401, description = "Not logged in", body = String)
    ),
    tag = "goals"
)]
pub async fn list(
    pool: Extension<PgPool>,
    Extension(CurrentUser(username)): Extension<CurrentUser>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let query = match GoalQuery::parse(&params) {
        Ok(query) => query,
        Err((status, message)) => return (status, message).into_response(),
    };

    let goals = match storage::list_goals(&pool, &username, query.start, query.end).await {
        Ok(goals) => goals,
        Err(err) => {
            error!("Failed to retrieve goals: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error retrieving goals".to_string(),
            )
                .into_response();
        }
    };

    debug!(username = %username, total = goals.len(), "goals in range");

    let views: Vec<GoalView> = goals
        .into_iter()
        .filter_map(|goal| {
            let status = goal.status_on(query.now);
            query.statuses.contains(&status).then(|| GoalView {
                title: goal.title,
                status: status.as_str(),
                notes: goal.notes,
                start_date: goal.start_date,
                due_date: goal.end_date,
            })
        })
        .collect();

    Json(views).into_response()
}

/// Parsed `GET /goals` query: a date range, a reference date for status
/// computation, and the set of statuses to keep.
#[derive(Debug)]
struct GoalQuery {
    start: NaiveDate,
    end: NaiveDate,
    now: NaiveDate,
    statuses: HashSet<GoalStatus>,
}

impl GoalQuery {
    fn parse(params: &[(String, String)]) -> Result<Self, (StatusCode, String)> {
        let start = required_date(params, "start")?;
        let end = required_date(params, "end")?;
        let now = required_date(params, "now")?;

        let labels: Vec<&str> = params
            .iter()
            .filter(|(key, _)| key == "status")
            .map(|(_, value)| value.as_str())
            .collect();
        if labels.is_empty() {
            return Err((StatusCode::BAD_REQUEST, "Missing status param".to_string()));
        }

        let statuses: HashSet<GoalStatus> =
            labels.iter().filter_map(|label| GoalStatus::parse(label)).collect();
        if statuses.is_empty() {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                "At least one status param must be one of 'In progress', 'Complete', 'Failed'"
                    .to_string(),
            ));
        }

        Ok(Self {
            start,
            end,
            now,
            statuses,
        })
    }
}

fn required_date(
    params: &[(String, String)],
    name: &str,
) -> Result<NaiveDate, (StatusCode, String)> {
    let value = params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Missing {name} param")))?;
    value.parse().map_err(|_| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Malformed {name} param"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn parse_accepts_full_query_with_repeated_statuses() {
        let query = GoalQuery::parse(&params(&[
            ("start", "2026-01-01"),
            ("end", "2026-02-01"),
            ("now", "2026-01-15"),
            ("status", "In progress"),
            ("status", "Failed"),
        ]))
        .expect("query");

        assert_eq!(query.start, "2026-01-01".parse::<NaiveDate>().unwrap());
        assert!(query.statuses.contains(&GoalStatus::InProgress));
        assert!(query.statuses.contains(&GoalStatus::Failed));
        assert!(!query.statuses.contains(&GoalStatus::Complete));
    }

    #[test]
    fn parse_rejects_missing_params_with_400() {
        for missing in ["start", "end", "now", "status"] {
            let pairs: Vec<(&str, &str)> = [
                ("start", "2026-01-01"),
                ("end", "2026-02-01"),
                ("now", "2026-01-15"),
                ("status", "Failed"),
            ]
            .into_iter()
            .filter(|(key, _)| *key != missing)
            .collect();
            let err = GoalQuery::parse(&params(&pairs)).expect_err("should fail");
            assert_eq!(err.0, StatusCode::BAD_REQUEST, "param: {missing}");
        }
    }

    #[test]
    fn parse_rejects_malformed_date_with_422() {
        let err = GoalQuery::parse(&params(&[
            ("start", "January 1st"),
            ("end", "2026-02-01"),
            ("now", "2026-01-15"),
            ("status", "Failed"),
        ]))
        .expect_err("should fail");
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn parse_rejects_unknown_statuses_with_422() {
        let err = GoalQuery::parse(&params(&[
            ("start", "2026-01-01"),
            ("end", "2026-02-01"),
            ("now", "2026-01-15"),
            ("status", "Done"),
        ]))
        .expect_err("should fail");
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
