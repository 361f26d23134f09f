pub mod gate;
pub mod middleware;
pub mod rate_limit;
