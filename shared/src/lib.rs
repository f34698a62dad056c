pub mod error;
pub mod models;
pub mod validation;
pub mod identity;
pub mod tally;

pub use error::ErrorResponse;
pub use models::*;
pub use validation::*;
pub use identity::Identity;
pub use tally::{SubmitOutcome, VoteChange, rank_options, recount, count_drift};
