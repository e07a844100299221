pub mod load_queries;
pub mod reserve_queries;
pub mod schema;
pub mod solar_queries;

pub use schema::ensure_schema;
