pub mod duration;
pub mod telemetry;

pub use duration::*;
pub use telemetry::*;
