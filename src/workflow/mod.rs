pub mod session_controller;
pub mod test_session;

pub use session_controller::{ControllerSettings, StepListener, TestSessionController};
pub use test_session::{Failure, FailureCause, Task1Outcome, TestSession};
