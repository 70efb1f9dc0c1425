//! Turn-taking: the state machine, the controller that executes it, and
//! the async session loop.

pub mod controller;
pub mod session;
pub mod sink;
pub mod state;

pub use controller::{ControllerConfig, ReplyTicket, TurnController};
pub use session::{SessionEvent, VoiceSession};
pub use sink::{CollectorSink, NullSink, SessionSink};
pub use state::{Phase, TurnState};
