//! Lifecycle state machine for the shared resource.
//!
//! Pure and synchronous: the machine records state and decides which side
//! effect (if any) the dispatcher should start next. Side effects themselves
//! run elsewhere and report back through [`LifecycleMachine::opened`] /
//! [`LifecycleMachine::closed`].
//!
//! Serialization invariant: at most one open/close side effect is in flight
//! at any time. A request arriving mid-transition only records the target;
//! the follow-up action is returned when the in-flight transition completes.

/// Observable resource state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl HandleState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            HandleState::Closed => 0,
            HandleState::Opening => 1,
            HandleState::Open => 2,
            HandleState::Closing => 3,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => HandleState::Opening,
            2 => HandleState::Open,
            3 => HandleState::Closing,
            _ => HandleState::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandleState::Closed => "closed",
            HandleState::Opening => "opening",
            HandleState::Open => "open",
            HandleState::Closing => "closing",
        }
    }
}

/// A requested resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Open,
    Closed,
}

/// Side effect the dispatcher must start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    BeginOpen,
    BeginClose,
}

pub(crate) struct LifecycleMachine {
    state: HandleState,
    /// Requested-but-not-yet-reached target. At most one.
    pending: Option<Target>,
}

impl LifecycleMachine {
    pub(crate) fn new() -> Self {
        Self {
            state: HandleState::Closed,
            pending: None,
        }
    }

    pub(crate) fn state(&self) -> HandleState {
        self.state
    }

    /// Request a target state. Returns the action to start now, if the
    /// machine is at rest; otherwise records the target (or ignores the
    /// request when already at or heading to the target).
    pub(crate) fn request(&mut self, target: Target) -> Option<Action> {
        match (target, self.state) {
            (Target::Open, HandleState::Open | HandleState::Opening) => None,
            (Target::Open, HandleState::Closed) => {
                self.pending = None;
                self.state = HandleState::Opening;
                Some(Action::BeginOpen)
            }
            (Target::Open, HandleState::Closing) => {
                self.pending = Some(Target::Open);
                None
            }
            (Target::Closed, HandleState::Closed | HandleState::Closing) => None,
            (Target::Closed, HandleState::Open) => {
                self.pending = None;
                self.state = HandleState::Closing;
                Some(Action::BeginClose)
            }
            (Target::Closed, HandleState::Opening) => {
                self.pending = Some(Target::Closed);
                None
            }
        }
    }

    /// The open side effect completed. Returns the follow-up action if a
    /// close was requested mid-open.
    pub(crate) fn opened(&mut self) -> Option<Action> {
        debug_assert_eq!(self.state, HandleState::Opening);
        self.state = HandleState::Open;
        match self.pending.take() {
            Some(Target::Closed) => {
                self.state = HandleState::Closing;
                Some(Action::BeginClose)
            }
            _ => None,
        }
    }

    /// The open side effect failed: roll back to closed so a later request
    /// starts a fresh attempt.
    pub(crate) fn open_failed(&mut self) {
        debug_assert_eq!(self.state, HandleState::Opening);
        self.state = HandleState::Closed;
        self.pending = None;
    }

    /// The close side effect finished (the resource is considered released
    /// even if the hook reported an error). Returns the follow-up action if
    /// an open was requested mid-close.
    pub(crate) fn closed(&mut self) -> Option<Action> {
        debug_assert_eq!(self.state, HandleState::Closing);
        self.state = HandleState::Closed;
        match self.pending.take() {
            Some(Target::Open) => {
                self.state = HandleState::Opening;
                Some(Action::BeginOpen)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_cycle() {
        let mut m = LifecycleMachine::new();
        assert_eq!(m.state(), HandleState::Closed);

        assert_eq!(m.request(Target::Open), Some(Action::BeginOpen));
        assert_eq!(m.state(), HandleState::Opening);

        assert_eq!(m.opened(), None);
        assert_eq!(m.state(), HandleState::Open);

        assert_eq!(m.request(Target::Closed), Some(Action::BeginClose));
        assert_eq!(m.state(), HandleState::Closing);

        assert_eq!(m.closed(), None);
        assert_eq!(m.state(), HandleState::Closed);
    }

    #[test]
    fn duplicate_requests_are_no_ops() {
        let mut m = LifecycleMachine::new();
        assert_eq!(m.request(Target::Closed), None);

        assert_eq!(m.request(Target::Open), Some(Action::BeginOpen));
        // Second open while opening must not start a second side effect.
        assert_eq!(m.request(Target::Open), None);

        m.opened();
        assert_eq!(m.request(Target::Open), None);

        assert_eq!(m.request(Target::Closed), Some(Action::BeginClose));
        // Second close while closing must not start a second side effect.
        assert_eq!(m.request(Target::Closed), None);
        assert_eq!(m.closed(), None);
    }

    #[test]
    fn close_requested_while_opening_runs_after_open() {
        let mut m = LifecycleMachine::new();
        m.request(Target::Open);

        assert_eq!(m.request(Target::Closed), None);
        assert_eq!(m.state(), HandleState::Opening);

        // The close begins only once the open completes.
        assert_eq!(m.opened(), Some(Action::BeginClose));
        assert_eq!(m.state(), HandleState::Closing);
        assert_eq!(m.closed(), None);
        assert_eq!(m.state(), HandleState::Closed);
    }

    #[test]
    fn open_requested_while_closing_runs_after_close() {
        let mut m = LifecycleMachine::new();
        m.request(Target::Open);
        m.opened();
        m.request(Target::Closed);

        assert_eq!(m.request(Target::Open), None);
        assert_eq!(m.state(), HandleState::Closing);

        assert_eq!(m.closed(), Some(Action::BeginOpen));
        assert_eq!(m.state(), HandleState::Opening);
        assert_eq!(m.opened(), None);
        assert_eq!(m.state(), HandleState::Open);
    }

    #[test]
    fn pending_target_can_be_superseded() {
        let mut m = LifecycleMachine::new();
        m.request(Target::Open);

        // Close requested mid-open, then open requested again: the machine
        // is already heading to open, so the pending close stays. The last
        // explicit request to a *different* target wins only via a new
        // request after the transition settles.
        m.request(Target::Closed);
        assert_eq!(m.opened(), Some(Action::BeginClose));
        assert_eq!(m.state(), HandleState::Closing);

        m.request(Target::Open);
        assert_eq!(m.closed(), Some(Action::BeginOpen));
        assert_eq!(m.opened(), None);
        assert_eq!(m.state(), HandleState::Open);
    }

    #[test]
    fn open_failure_rolls_back_to_closed() {
        let mut m = LifecycleMachine::new();
        m.request(Target::Open);
        m.request(Target::Closed); // pending close must not survive the rollback

        m.open_failed();
        assert_eq!(m.state(), HandleState::Closed);

        // A fresh request starts a fresh attempt.
        assert_eq!(m.request(Target::Open), Some(Action::BeginOpen));
    }

    #[test]
    fn state_u8_round_trip() {
        for s in [
            HandleState::Closed,
            HandleState::Opening,
            HandleState::Open,
            HandleState::Closing,
        ] {
            assert_eq!(HandleState::from_u8(s.as_u8()), s);
        }
    }
}
