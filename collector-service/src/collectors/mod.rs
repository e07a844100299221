pub mod reserve;
pub mod solar;

pub use reserve::ReserveCollector;
pub use solar::SolarCollector;

use time::OffsetDateTime;

/// Drop sub-second precision; snapshots are keyed at whole seconds.
pub fn truncate_to_second(ts: OffsetDateTime) -> OffsetDateTime {
    ts - time::Duration::nanoseconds(ts.nanosecond().into())
}
