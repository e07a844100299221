mod load;
mod reserve;
mod solar;

pub use load::LoadRecord;
pub use reserve::ReserveRecord;
pub use solar::SolarRecord;
