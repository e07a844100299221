pub mod collectors;
pub mod config;
pub mod fetch;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod schedule;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
