use crate::auth::auth::AdminUser;
use crate::engine::{plan_batch, Assignment, ConflictSnapshot};
use crate::model::{leave::Leave, replacement::Replacement};
use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LeaveBatchRequest {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = 2)]
    pub replacement_employee_id: u64,
    /// Candidate dates, evaluated independently in order.
    #[schema(example = json!(["2024-01-10", "2024-01-11"]), value_type = Vec<String>)]
    pub dates: Vec<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "approved": ["2024-01-10"],
    "declined": ["2024-01-11"]
}))]
pub struct LeaveBatchResponse {
    #[schema(value_type = Vec<String>)]
    pub approved: Vec<NaiveDate>,
    #[schema(value_type = Vec<String>)]
    pub declined: Vec<NaiveDate>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({ "title": "John Doe", "start": "2024-01-10" }))]
pub struct CalendarEntry {
    /// Leave-taking employee's name.
    pub title: String,
    #[schema(example = "2024-01-10", format = "date", value_type = String)]
    pub start: NaiveDate,
}

#[derive(Deserialize, ToSchema)]
pub struct EditLeave {
    #[schema(example = "2024-01-12", format = "date", value_type = String)]
    pub date: NaiveDate,
}

async fn employee_exists(pool: &MySqlPool, id: u64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ? LIMIT 1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Id of the replacement row paired with a leave on `date`. Admin edits
/// can leave several rows on the same (employee, date) pair; only the
/// first moves with the leave.
fn paired_replacement(candidates: &[Replacement], date: NaiveDate) -> Option<u64> {
    candidates.iter().find(|r| r.date == date).map(|r| r.id)
}

/* =========================
Submit a leave batch
========================= */
/// Evaluates every candidate date against the approval rules and commits
/// all approved Leave/Replacement rows in one transaction. Declined dates
/// are data, not errors.
#[utoipa::path(
    post,
    path = "/api/leave/request",
    request_body(
        content = LeaveBatchRequest,
        description = "Leave batch for one employee/replacement pair",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Approved/declined partition of the batch", body = LeaveBatchResponse),
        (status = 400, description = "Malformed date or payload"),
        (status = 404, description = "Unknown employee or replacement id")
    ),
    tag = "Leave"
)]
pub async fn request_leave(
    pool: web::Data<MySqlPool>,
    payload: web::Json<LeaveBatchRequest>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();

    // Unknown ids fail the whole batch, even an empty one, before
    // anything is evaluated.
    for id in [req.employee_id, req.replacement_employee_id] {
        let exists = employee_exists(pool.get_ref(), id).await.map_err(|e| {
            tracing::error!(error = %e, id, "Failed to check employee existence");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
        if !exists {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": format!("Employee {} not found", id)
            })));
        }
    }

    if req.dates.is_empty() {
        return Ok(HttpResponse::Ok().json(LeaveBatchResponse {
            approved: vec![],
            declined: vec![],
        }));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to begin transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count employees");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // Conflict state restricted to the candidate dates.
    let placeholders = vec!["?"; req.dates.len()].join(", ");

    let leaves_sql = format!(
        "SELECT employee_id, date FROM leaves WHERE date IN ({})",
        placeholders
    );
    let mut leaves_q = sqlx::query_as::<_, (u64, NaiveDate)>(&leaves_sql);
    for date in &req.dates {
        leaves_q = leaves_q.bind(date);
    }
    let leave_rows = leaves_q.fetch_all(&mut *tx).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load conflicting leaves");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let assignments_sql = format!(
        "SELECT employee_on_leave_id, replacement_employee_id, date FROM replacements WHERE date IN ({})",
        placeholders
    );
    let mut assignments_q = sqlx::query_as::<_, (u64, u64, NaiveDate)>(&assignments_sql);
    for date in &req.dates {
        assignments_q = assignments_q.bind(date);
    }
    let assignment_rows = assignments_q.fetch_all(&mut *tx).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load conflicting replacements");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let snapshot = ConflictSnapshot::new(
        total_employees,
        leave_rows,
        assignment_rows
            .into_iter()
            .map(|(on_leave, replacement, date)| Assignment {
                employee_on_leave_id: on_leave,
                replacement_employee_id: replacement,
                date,
            }),
    );

    let outcome = plan_batch(
        snapshot,
        req.employee_id,
        req.replacement_employee_id,
        &req.dates,
    );

    for &(employee_id, date) in &outcome.new_leaves {
        sqlx::query("INSERT INTO leaves (employee_id, date) VALUES (?, ?)")
            .bind(employee_id)
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, employee_id, "Failed to insert leave");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
    }

    for a in &outcome.new_assignments {
        sqlx::query(
            "INSERT INTO replacements (employee_on_leave_id, replacement_employee_id, date) VALUES (?, ?, ?)",
        )
        .bind(a.employee_on_leave_id)
        .bind(a.replacement_employee_id)
        .bind(a.date)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert replacement");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to commit leave batch");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    for (date, reason) in &outcome.declined {
        tracing::info!(
            employee_id = req.employee_id,
            replacement_employee_id = req.replacement_employee_id,
            date = %date,
            reason = reason.label(),
            "Leave date declined"
        );
    }

    Ok(HttpResponse::Ok().json(LeaveBatchResponse {
        approved: outcome.approved,
        declined: outcome.declined.into_iter().map(|(date, _)| date).collect(),
    }))
}

/* =========================
Calendar feed
========================= */
/// Swagger doc for get_leaves endpoint
#[utoipa::path(
    get,
    path = "/api/leaves",
    responses(
        (status = 200, description = "One entry per leave record", body = [CalendarEntry])
    ),
    tag = "Leave"
)]
pub async fn get_leaves(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let entries = sqlx::query_as::<_, CalendarEntry>(
        r#"
        SELECT e.name AS title, l.date AS `start`
        FROM leaves l
        JOIN employees e ON e.id = l.employee_id
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch leave list");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(entries))
}

/* =========================
Edit leave date (admin)
========================= */
/// Moves the leave to a new date; a Replacement paired with the old
/// (employee, date) moves with it in the same transaction.
#[utoipa::path(
    put,
    path = "/api/admin/leaves/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave to edit")
    ),
    request_body = EditLeave,
    responses(
        (status = 200, description = "Leave updated", body = Object, example = json!({
            "message": "Leave updated"
        })),
        (status = 400, description = "Malformed date"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn edit_leave(
    admin: AdminUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<EditLeave>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();
    let new_date = payload.date;

    let leave = sqlx::query_as::<_, Leave>("SELECT id, employee_id, date FROM leaves WHERE id = ?")
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to fetch leave");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let leave = match leave {
        Some(row) => row,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Leave not found"
            })))
        }
    };
    let old_date = leave.date;

    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to begin transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query("UPDATE leaves SET date = ? WHERE id = ?")
        .bind(new_date)
        .bind(leave_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to update leave date");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // Keep the paired replacement date-synchronized.
    let candidates = sqlx::query_as::<_, Replacement>(
        "SELECT id, employee_on_leave_id, replacement_employee_id, date FROM replacements WHERE employee_on_leave_id = ? ORDER BY id",
    )
    .bind(leave.employee_id)
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch replacement candidates");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if let Some(replacement_id) = paired_replacement(&candidates, old_date) {
        sqlx::query("UPDATE replacements SET date = ? WHERE id = ?")
            .bind(new_date)
            .bind(replacement_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, leave_id, "Failed to sync replacement date");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to commit leave edit");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tracing::info!(
        admin = %admin.username,
        leave_id,
        old_date = %old_date,
        new_date = %new_date,
        "Leave date edited"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave updated"
    })))
}

/* =========================
Delete leave (admin)
========================= */
#[utoipa::path(
    delete,
    path = "/api/admin/leaves/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave to delete")
    ),
    responses(
        (status = 200, description = "Leave and paired replacement deleted", body = Object, example = json!({
            "message": "Leave deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    admin: AdminUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, Leave>("SELECT id, employee_id, date FROM leaves WHERE id = ?")
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to fetch leave");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let leave = match leave {
        Some(row) => row,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Leave not found"
            })))
        }
    };

    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to begin transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query("DELETE FROM replacements WHERE employee_on_leave_id = ? AND date = ?")
        .bind(leave.employee_id)
        .bind(leave.date)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to delete paired replacement");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    sqlx::query("DELETE FROM leaves WHERE id = ?")
        .bind(leave_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to delete leave");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to commit leave deletion");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tracing::info!(admin = %admin.username, leave_id, "Leave deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn replacement(id: u64, on_leave: u64, covering: u64, date: NaiveDate) -> Replacement {
        Replacement {
            id,
            employee_on_leave_id: on_leave,
            replacement_employee_id: covering,
            date,
        }
    }

    #[test]
    fn edit_moves_the_replacement_paired_with_the_old_date() {
        let candidates = vec![
            replacement(7, 1, 2, d(9)),
            replacement(8, 1, 3, d(10)),
        ];

        assert_eq!(paired_replacement(&candidates, d(10)), Some(8));
    }

    #[test]
    fn edit_without_pairing_moves_nothing() {
        let candidates = vec![replacement(7, 1, 2, d(9))];

        assert_eq!(paired_replacement(&candidates, d(10)), None);
        assert_eq!(paired_replacement(&[], d(10)), None);
    }

    #[test]
    fn duplicate_pairs_move_only_the_first_row() {
        // A previous date edit can leave two rows on the same pair; the
        // sync must touch exactly one.
        let candidates = vec![
            replacement(7, 1, 2, d(10)),
            replacement(8, 1, 3, d(10)),
        ];

        assert_eq!(paired_replacement(&candidates, d(10)), Some(7));
    }
}
