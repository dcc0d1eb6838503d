pub mod logging;
pub mod time;

pub use logging::truncate_text;
pub use time::{fixed_clock, fixed_now, Clock};
