//! Public types shared by the controller, transports and caches

mod options;
mod request;
mod state;

pub use options::{DEFAULT_BASE_BACKOFF, DEFAULT_MAX_RETRIES, DEFAULT_TTL, FetchOptions};
pub use request::RequestSpec;
pub use state::{Outcome, RequestState, RequestStatus};

pub(crate) use request::key_digest;
