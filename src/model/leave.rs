use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of approved absence for one employee.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Leave {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
}
