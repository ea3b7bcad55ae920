pub mod profile;

pub use profile::{GameRecord, ProfileClient, RecordOutcome, UserProfile};
