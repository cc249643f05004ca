use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Who covers for whom on a given date. Created in lockstep with the
/// matching Leave row at approval time and kept date-synchronized by the
/// admin edit operations.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Replacement {
    pub id: u64,
    pub employee_on_leave_id: u64,
    pub replacement_employee_id: u64,
    pub date: NaiveDate,
}
