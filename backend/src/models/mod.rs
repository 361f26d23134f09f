pub mod daily_record;
pub mod reflection;
pub mod summary;
