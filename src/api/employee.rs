use crate::auth::auth::AdminUser;
use crate::model::{employee::Employee, leave::Leave, replacement::Replacement};
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RenameEmployee {
    #[schema(example = "John D. Doe")]
    pub name: String,
}

/// Dependent rows removed with an employee.
#[derive(Debug, Default, PartialEq)]
struct CascadePlan {
    leave_ids: Vec<u64>,
    replacement_ids: Vec<u64>,
}

/// Selects everything that references the employee: leaves where they
/// are the leave-taker, and replacement rows where they appear in either
/// role. Rows naming other employees are untouched.
fn cascade_targets(
    employee_id: u64,
    leaves: &[Leave],
    replacements: &[Replacement],
) -> CascadePlan {
    CascadePlan {
        leave_ids: leaves
            .iter()
            .filter(|l| l.employee_id == employee_id)
            .map(|l| l.id)
            .collect(),
        replacement_ids: replacements
            .iter()
            .filter(|r| {
                r.employee_on_leave_id == employee_id
                    || r.replacement_employee_id == employee_id
            })
            .map(|r| r.id)
            .collect(),
    }
}

async fn delete_by_ids(
    tx: &mut Transaction<'_, MySql>,
    table: &str,
    ids: &[u64],
) -> Result<(), sqlx::Error> {
    if ids.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM {} WHERE id IN ({})", table, placeholders);
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    query.execute(&mut **tx).await?;

    Ok(())
}

/// Removes the rows picked by [`cascade_targets`]. Runs inside the
/// caller's transaction; returns (leaves_removed, replacements_removed).
async fn delete_employee_cascade(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
) -> Result<(u64, u64), sqlx::Error> {
    let leaves =
        sqlx::query_as::<_, Leave>("SELECT id, employee_id, date FROM leaves WHERE employee_id = ?")
            .bind(employee_id)
            .fetch_all(&mut **tx)
            .await?;

    let replacements = sqlx::query_as::<_, Replacement>(
        "SELECT id, employee_on_leave_id, replacement_employee_id, date FROM replacements WHERE employee_on_leave_id = ? OR replacement_employee_id = ?",
    )
    .bind(employee_id)
    .bind(employee_id)
    .fetch_all(&mut **tx)
    .await?;

    let plan = cascade_targets(employee_id, &leaves, &replacements);

    delete_by_ids(tx, "leaves", &plan.leave_ids).await?;
    delete_by_ids(tx, "replacements", &plan.replacement_ids).await?;

    Ok((plan.leave_ids.len() as u64, plan.replacement_ids.len() as u64))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "All employees", body = [Employee])
    ),
    tag = "Employee"
)]
pub async fn list_employees(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employees =
        sqlx::query_as::<_, Employee>("SELECT id, name FROM employees ORDER BY id")
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch employees");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    Ok(HttpResponse::Ok().json(employees))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/admin/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "id": 1,
            "message": "Employee created"
        })),
        (status = 400, description = "Missing or empty name"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    admin: AdminUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name must not be empty"
        })));
    }

    // No uniqueness check; duplicate names are allowed.
    let result = sqlx::query("INSERT INTO employees (name) VALUES (?)")
        .bind(name)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create employee");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    tracing::info!(admin = %admin.username, name, "Employee created");

    Ok(HttpResponse::Created().json(json!({
        "id": result.last_insert_id(),
        "message": "Employee created"
    })))
}

/// Rename Employee
#[utoipa::path(
    put,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = RenameEmployee,
    responses(
        (status = 200, description = "Employee renamed", body = Object, example = json!({
            "message": "Employee renamed"
        })),
        (status = 400, description = "Missing or empty name"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn rename_employee(
    admin: AdminUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<RenameEmployee>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    let name = payload.name.trim();

    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name must not be empty"
        })));
    }

    let result = sqlx::query("UPDATE employees SET name = ? WHERE id = ?")
        .bind(name)
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to rename employee");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    tracing::info!(admin = %admin.username, employee_id, name, "Employee renamed");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee renamed"
    })))
}

/// Delete Employee (cascades to leaves and replacements)
#[utoipa::path(
    delete,
    path = "/api/admin/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee and dependents deleted", body = Object, example = json!({
            "message": "Employee deleted",
            "leaves_removed": 2,
            "replacements_removed": 3
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    admin: AdminUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ? LIMIT 1)",
    )
    .bind(employee_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to check employee existence");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if !exists {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to begin transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let (leaves_removed, replacements_removed) = delete_employee_cascade(&mut tx, employee_id)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to cascade-delete employee records");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to delete employee");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit employee deletion");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tracing::info!(
        admin = %admin.username,
        employee_id,
        leaves_removed,
        replacements_removed,
        "Employee deleted"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted",
        "leaves_removed": leaves_removed,
        "replacements_removed": replacements_removed
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn leave(id: u64, employee_id: u64, date: NaiveDate) -> Leave {
        Leave {
            id,
            employee_id,
            date,
        }
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
    fn cascade_removes_every_dependent_row() {
        let leaves = vec![
            leave(1, 5, d(10)),
            leave(2, 5, d(11)),
            leave(3, 6, d(10)), // someone else's leave stays
        ];
        let replacements = vec![
            replacement(1, 5, 7, d(10)), // on leave
            replacement(2, 8, 5, d(12)), // covering
            replacement(3, 6, 7, d(10)), // unrelated, stays
        ];

        let plan = cascade_targets(5, &leaves, &replacements);

        assert_eq!(plan.leave_ids, vec![1, 2]);
        assert_eq!(plan.replacement_ids, vec![1, 2]);
    }

    #[test]
    fn cascade_covers_both_replacement_roles() {
        let replacements = vec![
            replacement(1, 5, 6, d(10)),
            replacement(2, 6, 5, d(10)),
        ];

        let plan = cascade_targets(5, &[], &replacements);

        assert_eq!(plan.replacement_ids, vec![1, 2]);
    }

    #[test]
    fn cascade_without_dependents_is_empty() {
        let leaves = vec![leave(1, 6, d(10))];
        let replacements = vec![replacement(1, 6, 7, d(10))];

        let plan = cascade_targets(5, &leaves, &replacements);

        assert_eq!(plan, CascadePlan::default());
    }
}
