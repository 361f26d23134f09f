pub mod daily_records;
pub mod files;
pub mod health;
pub mod reflections;
pub mod stats;
