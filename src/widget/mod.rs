pub mod clock;
pub mod controller;
pub mod view;

pub use clock::{Clock, SystemClock};
pub use controller::WidgetController;
pub use view::WidgetView;
