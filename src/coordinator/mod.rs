pub mod cumulative;
pub mod refresh;
pub mod scheduler;

pub use cumulative::{CumulativeCoordinator, EstimateSource};
pub use refresh::{ForecastCoordinator, RetentionPolicy};
pub use scheduler::{PollScheduler, TaskStatus};
