//! Observable request state and per-attempt outcomes

use crate::HuginnError;

/// Lifecycle status of a controller.
///
/// `Idle → Loading → {Success, Error}`, then back to `Loading` on the next
/// trigger. `Idle` is only ever the initial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl RequestStatus {
    /// Whether a resolution cycle has finished (successfully or not).
    pub fn is_settled(self) -> bool {
        matches!(self, RequestStatus::Success | RequestStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Idle => "idle",
            RequestStatus::Loading => "loading",
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of what a controller currently knows about its resource.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub status: RequestStatus,
    /// Last resolved payload, or the initial value given at build time.
    pub data: Option<T>,
    /// Terminal failure of the last cycle. Cleared when a new attempt starts.
    pub error: Option<HuginnError>,
    /// Retries issued for the in-flight cycle.
    pub attempt: u32,
}

impl<T> RequestState<T> {
    pub(crate) fn new(initial: Option<T>) -> Self {
        Self {
            status: RequestStatus::Idle,
            data: initial,
            error: None,
            attempt: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::Loading
    }

    pub(crate) fn begin(&mut self) {
        self.status = RequestStatus::Loading;
        self.error = None;
        self.attempt = 0;
    }

    pub(crate) fn retrying(&mut self, attempt: u32) {
        self.error = None;
        self.attempt = attempt;
    }

    pub(crate) fn succeed(&mut self, payload: T) {
        self.status = RequestStatus::Success;
        self.data = Some(payload);
        self.error = None;
        self.attempt = 0;
    }

    pub(crate) fn fail(&mut self, error: HuginnError) {
        self.status = RequestStatus::Error;
        self.error = Some(error);
    }
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Result of a single transport attempt.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Success(T),
    Failure(HuginnError),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}

impl<T> From<crate::Result<T>> for Outcome<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(HuginnError::Aborted) => Outcome::Cancelled,
            Err(err) => Outcome::Failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_idle() {
        let state: RequestState<u32> = RequestState::new(Some(7));
        assert_eq!(state.status, RequestStatus::Idle);
        assert_eq!(state.data, Some(7));
        assert!(state.error.is_none());
        assert_eq!(state.attempt, 0);
    }

    #[test]
    fn begin_clears_error_and_attempt() {
        let mut state: RequestState<u32> = RequestState::default();
        state.attempt = 2;
        state.fail(HuginnError::Http("reset".into()));
        state.begin();
        assert!(state.is_loading());
        assert!(state.error.is_none());
        assert_eq!(state.attempt, 0);
    }

    #[test]
    fn succeed_resets_attempt() {
        let mut state = RequestState::default();
        state.begin();
        state.retrying(2);
        state.succeed("payload");
        assert_eq!(state.status, RequestStatus::Success);
        assert_eq!(state.data, Some("payload"));
        assert_eq!(state.attempt, 0);
    }

    #[test]
    fn fail_keeps_previous_data() {
        let mut state = RequestState::new(Some(1));
        state.begin();
        state.fail(HuginnError::Status {
            status: 503,
            message: "unavailable".into(),
        });
        assert_eq!(state.status, RequestStatus::Error);
        assert_eq!(state.data, Some(1));
        assert_eq!(state.error.as_ref().and_then(HuginnError::status), Some(503));
    }

    #[test]
    fn outcome_from_result() {
        assert!(matches!(Outcome::from(Ok::<_, HuginnError>(1)), Outcome::Success(1)));
        assert!(Outcome::<u8>::from(Err(HuginnError::Aborted)).is_cancelled());
        assert!(matches!(
            Outcome::<u8>::from(Err(HuginnError::Http("down".into()))),
            Outcome::Failure(HuginnError::Http(_))
        ));
    }

    #[test]
    fn status_settled() {
        assert!(!RequestStatus::Idle.is_settled());
        assert!(!RequestStatus::Loading.is_settled());
        assert!(RequestStatus::Success.is_settled());
        assert!(RequestStatus::Error.is_settled());
        assert_eq!(RequestStatus::Loading.to_string(), "loading");
    }
}
