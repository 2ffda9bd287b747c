mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use router::{handle_job_done, handle_request};
pub use types::{AppState, Reply, Request};
