pub mod actor;
pub mod machine;
pub mod outcome;

pub use actor::{GameSessionActor, SessionTimings, SessionUpdate};
pub use machine::{SessionMachine, SessionSnapshot};
