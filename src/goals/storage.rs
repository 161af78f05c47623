//! Goal table queries.

use sqlx::{PgPool, QueryBuilder, Row};
use tracing::Instrument;

use super::{GoalRecord, NewGoal};

const SELECT_GOALS: &str = r"
    SELECT title, start_date, end_date, notes, completed_at
    FROM Goal
    WHERE username = $1
      AND start_date >= $2
      AND start_date <= $3
    ORDER BY start_date, id
";

/// Insert a batch of goals for `username` in one statement.
///
/// # Errors
///
/// Store failures; an empty batch is rejected by the handler before this
/// point.
pub async fn insert_goals(
    pool: &PgPool,
    username: &str,
    goals: &[NewGoal],
) -> Result<(), sqlx::Error> {
    let mut builder =
        QueryBuilder::new("INSERT INTO Goal (username, title, start_date, end_date, notes) ");
    builder.push_values(goals, |mut row, goal| {
        row.push_bind(username)
            .push_bind(&goal.title)
            .push_bind(goal.start)
            .push_bind(goal.due)
            .push_bind(&goal.notes);
    });

    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = "INSERT INTO Goal (username, title, start_date, end_date, notes) VALUES ..."
    );
    builder.build().execute(pool).instrument(span).await?;
    Ok(())
}

/// All goals for `username` whose start date falls in `[start, end]`.
///
/// # Errors
///
/// Store failures only.
pub async fn list_goals(
    pool: &PgPool,
    username: &str,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> Result<Vec<GoalRecord>, sqlx::Error> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = SELECT_GOALS
    );
    let rows = sqlx::query(SELECT_GOALS)
        .bind(username)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| GoalRecord {
            title: row.get("title"),
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            notes: row.get("notes"),
            completed_at: row.get("completed_at"),
        })
        .collect())
}
