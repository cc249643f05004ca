pub mod employee;
pub mod leave;
pub mod schedule;
