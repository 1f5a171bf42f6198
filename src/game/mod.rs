pub mod engine;
pub mod guards;
pub mod selector;
pub mod session;

pub use engine::{GameEngine, GameSnapshot, TickOutcome, Verdict};
pub use guards::{ActionLock, LockDenied};
pub use selector::PoseSelector;
pub use session::{ClientMessage, GameSession, ServerMessage, SessionEvent};
