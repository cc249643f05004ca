use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

/// Marker used when a leave has no covering replacement.
const NO_REPLACEMENT: &str = "No Replacement";

#[derive(Debug, sqlx::FromRow)]
struct ScheduleLeaveRow {
    employee_id: u64,
    employee_name: String,
    date: NaiveDate,
}

#[derive(Debug, sqlx::FromRow)]
struct ScheduleCoverRow {
    employee_on_leave_id: u64,
    date: NaiveDate,
    replacement_name: String,
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
#[schema(example = json!({
    "employee_name": "John Doe",
    "date": "2024-01-10",
    "replacement_name": "Jane Roe"
}))]
pub struct ScheduleEntry {
    pub employee_name: String,
    #[schema(example = "2024-01-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Covering employee's name, or "No Replacement".
    pub replacement_name: String,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "employee_on_leave": "John Doe",
    "replacement_employee": "Jane Roe",
    "date": "2024-01-10"
}))]
pub struct ReplacementEntry {
    pub employee_on_leave: String,
    pub replacement_employee: String,
    #[schema(example = "2024-01-10", format = "date", value_type = String)]
    pub date: NaiveDate,
}

/// Joins each leave with at most one covering replacement. Admin edits
/// can leave several replacement rows on the same (employee, date) pair;
/// only the first is reported, so the projection stays one entry per
/// leave record.
fn build_schedule(
    leaves: Vec<ScheduleLeaveRow>,
    covers: Vec<ScheduleCoverRow>,
) -> Vec<ScheduleEntry> {
    leaves
        .into_iter()
        .map(|leave| {
            let replacement_name = covers
                .iter()
                .find(|c| c.employee_on_leave_id == leave.employee_id && c.date == leave.date)
                .map(|c| c.replacement_name.clone())
                .unwrap_or_else(|| NO_REPLACEMENT.to_string());

            ScheduleEntry {
                employee_name: leave.employee_name,
                date: leave.date,
                replacement_name,
            }
        })
        .collect()
}

/// Chronological schedule: one entry per leave, with the covering
/// replacement resolved. Pure read projection.
#[utoipa::path(
    get,
    path = "/api/schedule",
    responses(
        (status = 200, description = "Chronologically ordered schedule", body = [ScheduleEntry])
    ),
    tag = "Schedule"
)]
pub async fn leave_schedule(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let leaves = sqlx::query_as::<_, ScheduleLeaveRow>(
        r#"
        SELECT l.employee_id AS employee_id, e.name AS employee_name, l.date AS date
        FROM leaves l
        JOIN employees e ON e.id = l.employee_id
        ORDER BY l.date
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch leave schedule");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let covers = sqlx::query_as::<_, ScheduleCoverRow>(
        r#"
        SELECT r.employee_on_leave_id AS employee_on_leave_id, r.date AS date,
               re.name AS replacement_name
        FROM replacements r
        JOIN employees re ON re.id = r.replacement_employee_id
        ORDER BY r.id
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch schedule replacements");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(build_schedule(leaves, covers)))
}

/// Swagger doc for get_replacements endpoint
#[utoipa::path(
    get,
    path = "/api/replacements",
    responses(
        (status = 200, description = "All covering assignments", body = [ReplacementEntry])
    ),
    tag = "Schedule"
)]
pub async fn get_replacements(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let entries = sqlx::query_as::<_, ReplacementEntry>(
        r#"
        SELECT eol.name AS employee_on_leave, rep.name AS replacement_employee, r.date AS date
        FROM replacements r
        JOIN employees eol ON eol.id = r.employee_on_leave_id
        JOIN employees rep ON rep.id = r.replacement_employee_id
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch replacements");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn leave_row(employee_id: u64, name: &str, date: NaiveDate) -> ScheduleLeaveRow {
        ScheduleLeaveRow {
            employee_id,
            employee_name: name.to_string(),
            date,
        }
    }

    fn cover_row(employee_on_leave_id: u64, date: NaiveDate, name: &str) -> ScheduleCoverRow {
        ScheduleCoverRow {
            employee_on_leave_id,
            date,
            replacement_name: name.to_string(),
        }
    }

    #[test]
    fn one_entry_per_leave_record() {
        // Two leaves for the same employee on the same date, each with a
        // replacement row on that (employee, date) pair, as a date edit
        // can produce. The projection must not multiply entries.
        let leaves = vec![
            leave_row(1, "John", d(12)),
            leave_row(1, "John", d(12)),
        ];
        let covers = vec![
            cover_row(1, d(12), "Jane"),
            cover_row(1, d(12), "Mary"),
        ];

        let schedule = build_schedule(leaves, covers);

        assert_eq!(schedule.len(), 2);
        for entry in &schedule {
            assert_eq!(entry.replacement_name, "Jane");
        }
    }

    #[test]
    fn missing_replacement_uses_marker() {
        let leaves = vec![leave_row(1, "John", d(10))];

        let schedule = build_schedule(leaves, vec![]);

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].replacement_name, NO_REPLACEMENT);
    }

    #[test]
    fn replacement_must_match_employee_and_date() {
        let leaves = vec![leave_row(1, "John", d(10))];
        let covers = vec![
            cover_row(1, d(11), "Jane"), // right employee, wrong date
            cover_row(2, d(10), "Mary"), // wrong employee, right date
        ];

        let schedule = build_schedule(leaves, covers);

        assert_eq!(schedule[0].replacement_name, NO_REPLACEMENT);
    }

    #[test]
    fn input_order_is_preserved() {
        let leaves = vec![
            leave_row(1, "John", d(10)),
            leave_row(2, "Jane", d(11)),
            leave_row(3, "Mary", d(12)),
        ];

        let schedule = build_schedule(leaves, vec![]);

        let dates: Vec<NaiveDate> = schedule.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d(10), d(11), d(12)]);
    }
}
