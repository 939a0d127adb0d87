//! Fetch-cycle state primitives.
//!
//! A cycle moves `Idle -> InFlight -> Ready | ErrorOccurred` and restarts on every
//! refresh. Panels that fill in independently after the cycle is `Ready` use [`Slot`].

/// Overall state of one fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    InFlight,
    Ready,
    ErrorOccurred(String),
}

impl FetchState {
    pub fn is_ready(&self) -> bool {
        matches!(self, FetchState::Ready)
    }

    /// Message of the cycle-level error, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::ErrorOccurred(message) => Some(message),
            _ => None,
        }
    }

    /// State after a cycle starts. Any state may restart.
    pub fn on_cycle_started(&self) -> Self {
        FetchState::InFlight
    }

    /// State after the location step finished.
    pub fn on_location_done(&self, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => FetchState::Ready,
            Err(message) => FetchState::ErrorOccurred(message),
        }
    }
}

/// Result holder for one independently loaded panel.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    /// Request outstanding (or not yet issued in the current cycle)
    Pending,
    Loaded(T),
    /// Settled with nothing to show and nothing to report
    Empty,
    Failed(String),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Pending
    }
}

impl<T> Slot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Slot::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Slot::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Build a slot from a fetch result where `Ok(None)` means "nothing to show".
    pub fn from_optional<E: ToString>(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(value)) => Slot::Loaded(value),
            Ok(None) => Slot::Empty,
            Err(e) => Slot::Failed(e.to_string()),
        }
    }
}

impl<T, E: ToString> From<Result<T, E>> for Slot<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Slot::Loaded(value),
            Err(e) => Slot::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_default() {
        assert_eq!(FetchState::default(), FetchState::Idle);
    }

    #[test]
    fn any_state_restarts_in_flight() {
        for state in [
            FetchState::Idle,
            FetchState::InFlight,
            FetchState::Ready,
            FetchState::ErrorOccurred("x".into()),
        ] {
            assert_eq!(state.on_cycle_started(), FetchState::InFlight);
        }
    }

    #[test]
    fn location_success_transitions_to_ready() {
        let state = FetchState::InFlight.on_location_done(Ok(()));
        assert!(state.is_ready());
        assert_eq!(state.error(), None);
    }

    #[test]
    fn location_failure_records_message() {
        let state = FetchState::InFlight.on_location_done(Err("denied".into()));
        assert_eq!(state.error(), Some("denied"));
        assert!(!state.is_ready());
    }

    #[test]
    fn slot_from_result() {
        let ok: Slot<i32> = Ok::<_, String>(3).into();
        assert_eq!(ok.loaded(), Some(&3));

        let err: Slot<i32> = Err::<i32, _>("boom").into();
        assert_eq!(err.failure(), Some("boom"));
        assert!(!err.is_pending());
    }

    #[test]
    fn slot_from_optional_empty() {
        let slot: Slot<i32> = Slot::from_optional(Ok::<_, String>(None));
        assert_eq!(slot, Slot::Empty);
        assert_eq!(slot.loaded(), None);
    }
}
