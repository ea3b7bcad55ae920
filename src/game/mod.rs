pub mod clock;
pub mod notation;
pub mod reconcile;
pub mod rules;
pub mod utils;
