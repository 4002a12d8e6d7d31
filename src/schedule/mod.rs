pub mod projector;
pub mod scheduler;
pub mod state;

pub use projector::{project, project_from, PeriodAnchor};
pub use scheduler::{Scheduler, SchedulerEffect};
pub use state::{Cadence, Phase, SchedulerState};
