pub mod constants;
pub mod event_bus;
pub mod naming;
pub mod util;
pub mod value;

pub use constants::*;
pub use event_bus::ChangeBus;
pub use naming::validate_name;
pub use util::{atomic, current_time_millis, Atomic, ReadExecutor, WriteExecutor};
pub use value::{DocumentBody, Value};
