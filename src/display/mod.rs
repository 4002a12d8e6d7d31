pub mod classify;
pub mod dial;

pub use classify::{classify, DisplayWindow};
pub use dial::{HandAngles, Sector};
