pub mod aggregate;
pub mod calendar;
pub mod submission;
pub mod upsert;
