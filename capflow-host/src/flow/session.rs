//! Per-session mutable state
//!
//! One [`RequestSession`] lives for exactly one orchestration, from start to
//! terminal outcome. It holds the still-denied subset of the request and
//! the "just returned from an OS prompt" flag, which exists only here and
//! transitions only through the state machine — never as ambient
//! process-wide state.

use capflow_api::Outcome;

/// Externally observable state of a permission flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Created, not yet started.
    Idle,
    /// Querying the oracle; transient within one event step.
    AwaitingOracle,
    /// An OS permission prompt is in flight.
    AwaitingOsPrompt,
    /// The rationale dialog is up; transient within one event step.
    AwaitingRationaleDialog,
    /// The settings-redirect dialog is up; transient within one event step.
    AwaitingSettingsDialog,
    /// The user is on the settings screen.
    AwaitingSettingsScreen,
    /// Terminal. Further events are absorbed.
    Done(Outcome),
}

/// Mutable state for one in-flight permission request
///
/// Invariant: the pending set is always a subset of the original request's
/// identifiers, in request order.
#[derive(Debug)]
pub struct RequestSession {
    pending: Vec<String>,
    from_os_prompt: bool,
}

impl RequestSession {
    /// Start a fresh session covering the whole request.
    pub fn new(capabilities: &[String]) -> Self {
        Self {
            pending: capabilities.to_vec(),
            from_os_prompt: false,
        }
    }

    /// Capabilities still denied, in request order.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Replace the pending set with the still-denied capabilities.
    pub fn set_pending(&mut self, pending: Vec<String>) {
        self.pending = pending;
    }

    /// Note that the next event originates from an OS prompt round-trip.
    pub fn mark_returned_from_prompt(&mut self) {
        self.from_os_prompt = true;
    }

    /// Forget the prompt round-trip marker.
    ///
    /// Called when the hosting surface loses foreground, so that regaining
    /// it without an explicit result event is a fresh decision point rather
    /// than a stale continuation.
    pub fn clear_prompt_return(&mut self) {
        self.from_os_prompt = false;
    }

    /// Whether the session just returned from an OS prompt.
    pub fn returned_from_prompt(&self) -> bool {
        self.from_os_prompt
    }
}
