pub mod costing;
pub mod execution;
pub mod methodology;
pub mod payback;
pub mod scenario;
pub mod spatial;
pub mod units;
