//! Request orchestrator
//!
//! The state machine at the heart of the flow. It advances exactly one step
//! per external event, consumes the oracle/dialog/settings collaborators,
//! and delivers exactly one [`Outcome`] per session through a oneshot
//! channel.

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use capflow_api::{CapabilityRequest, GrantResults, Outcome};

use super::dialog::DialogChoice;
use super::host::FlowHost;
use super::session::{FlowState, RequestSession};

/// What the host must do after feeding the flow an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    /// Show the OS permission prompt for these capabilities, then report
    /// the result via [`PermissionFlow::on_os_prompt_result`].
    RequestOsPrompt(Vec<String>),
    /// The settings screen was opened; report the user's return via
    /// [`PermissionFlow::on_foreground_regained`].
    SettingsOpened,
    /// The session is over.
    Finished(Outcome),
    /// Nothing to do; an earlier step is still in flight.
    Pending,
}

/// Receiving end for a session's terminal outcome
///
/// Awaiting it is the result-delivery variant of starting a request;
/// dropping it is fire-and-forget. Exactly one outcome is ever sent.
#[derive(Debug)]
pub struct OutcomeReceiver {
    rx: oneshot::Receiver<Outcome>,
}

impl OutcomeReceiver {
    /// Wait for the outcome. `None` if the flow was dropped unfinished.
    pub async fn recv(self) -> Option<Outcome> {
        self.rx.await.ok()
    }

    /// Blocking variant of [`recv`](Self::recv) for synchronous hosts.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async runtime.
    pub fn blocking_recv(self) -> Option<Outcome> {
        self.rx.blocking_recv().ok()
    }

    /// Poll for an already-delivered outcome without waiting.
    pub fn try_recv(&mut self) -> Option<Outcome> {
        self.rx.try_recv().ok()
    }
}

/// One in-flight permission request, from start to terminal outcome
///
/// Single-threaded and event-driven: the host owns the flow, feeds it one
/// lifecycle event at a time, and performs whatever the returned
/// [`FlowStep`] asks for. Each flow is single-use; a new request needs a
/// new flow.
pub struct PermissionFlow {
    request: CapabilityRequest,
    host: FlowHost,
    state: FlowState,
    session: RequestSession,
    outcome_tx: Option<oneshot::Sender<Outcome>>,
}

impl PermissionFlow {
    /// Start a session for a validated request.
    ///
    /// Returns the flow plus the receiver for its terminal outcome. No
    /// state transition happens until [`on_session_start`]
    /// (Self::on_session_start) is called.
    pub fn start(request: CapabilityRequest, host: FlowHost) -> (Self, OutcomeReceiver) {
        let (tx, rx) = oneshot::channel();
        let session = RequestSession::new(request.capabilities());
        let flow = Self {
            request,
            host,
            state: FlowState::Idle,
            session,
            outcome_tx: Some(tx),
        };
        (flow, OutcomeReceiver { rx })
    }

    /// Current state of the flow.
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Whether a terminal outcome has been produced.
    pub fn is_done(&self) -> bool {
        matches!(self.state, FlowState::Done(_))
    }

    /// The request this session is serving.
    pub fn request(&self) -> &CapabilityRequest {
        &self.request
    }

    /// The hosting surface came up.
    ///
    /// `restored` marks a surface recreated from serialized state out of
    /// band (e.g. force-stopped while the user was in the settings screen).
    /// Such a session never resumes: stale state cannot be trusted to
    /// reflect real grant status, so it terminates immediately without a
    /// single oracle query.
    pub fn on_session_start(&mut self, restored: bool) -> FlowStep {
        if let FlowState::Done(outcome) = self.state {
            return FlowStep::Finished(outcome);
        }
        if restored {
            warn!("session restored from stale state, terminating");
            return self.finish(Outcome::SomeDenied);
        }
        if self.state != FlowState::Idle {
            warn!(state = ?self.state, "session already started");
            return FlowStep::Pending;
        }

        debug!(
            capabilities = ?self.request.capabilities(),
            "start permission request"
        );

        if self.request.is_empty() {
            return self.finish(Outcome::AllGranted);
        }
        self.evaluate()
    }

    /// The OS prompt came back with per-capability results.
    pub fn on_os_prompt_result(&mut self, results: GrantResults) -> FlowStep {
        if let FlowState::Done(outcome) = self.state {
            return FlowStep::Finished(outcome);
        }
        if self.state != FlowState::AwaitingOsPrompt {
            warn!(state = ?self.state, "unexpected OS prompt result");
            return FlowStep::Pending;
        }

        self.session.mark_returned_from_prompt();

        if results.granted_all() {
            return self.finish(Outcome::AllGranted);
        }

        let pending: Vec<String> = results.denied().iter().map(|c| c.to_string()).collect();
        debug_assert!(
            pending.iter().all(|c| self.request.contains(c)),
            "prompt result names capabilities outside the request"
        );
        self.session.set_pending(pending);

        let show_rationale = self
            .session
            .pending()
            .iter()
            .any(|c| self.host.oracle.should_show_rationale(c));
        debug!(
            pending = ?self.session.pending(),
            decision = if show_rationale { "rationale" } else { "go settings" },
            "un-granted capabilities remain"
        );

        if show_rationale {
            self.run_rationale_dialog()
        } else {
            self.run_settings_dialog()
        }
    }

    /// The hosting surface regained foreground.
    ///
    /// Returning from the settings screen ends the session: grant changes
    /// made there are not synchronously observable, so the visit counts as
    /// a terminal denial. Regaining foreground mid-prompt without a result
    /// event is a fresh decision point and re-queries the oracle.
    pub fn on_foreground_regained(&mut self) -> FlowStep {
        match self.state {
            FlowState::Done(outcome) => FlowStep::Finished(outcome),
            FlowState::AwaitingSettingsScreen => {
                info!("returned from settings, ending session");
                self.finish(Outcome::SomeDenied)
            }
            FlowState::AwaitingOsPrompt => {
                if self.session.returned_from_prompt() {
                    // The prompt result event already drove this step.
                    FlowStep::Pending
                } else {
                    debug!("foreground regained without a prompt result, re-checking");
                    self.evaluate()
                }
            }
            _ => FlowStep::Pending,
        }
    }

    /// The hosting surface lost foreground.
    ///
    /// Clears the prompt round-trip marker so an unrelated app resume is
    /// never mistaken for a continuation of this session.
    pub fn on_foreground_lost(&mut self) {
        debug!("foreground lost");
        self.session.clear_prompt_return();
    }

    /// Query the oracle and either finish or issue an OS prompt.
    fn evaluate(&mut self) -> FlowStep {
        self.state = FlowState::AwaitingOracle;
        let statuses = self.host.oracle.query_status(self.request.capabilities());
        let pending: Vec<String> = self
            .request
            .capabilities()
            .iter()
            .filter(|c| !statuses.get(*c).is_some_and(|s| s.is_granted()))
            .cloned()
            .collect();

        if pending.is_empty() {
            return self.finish(Outcome::AllGranted);
        }

        debug!(pending = ?pending, "requesting capabilities from OS");
        self.session.set_pending(pending.clone());
        self.issue_prompt(pending)
    }

    /// Show the combined rationale dialog for the pending set.
    fn run_rationale_dialog(&mut self) -> FlowStep {
        self.state = FlowState::AwaitingRationaleDialog;
        match self.host.dialogs.confirm(self.request.rationale_message()) {
            Ok(DialogChoice::Accepted) => {
                info!("rationale accepted, restarting request");
                self.issue_prompt(self.session.pending().to_vec())
            }
            Ok(DialogChoice::Declined) => {
                info!("rationale declined, cancelling request");
                self.finish(Outcome::SomeDenied)
            }
            Err(err) => {
                warn!(%err, "rationale dialog failed, treating as decline");
                self.finish(Outcome::SomeDenied)
            }
        }
    }

    /// Show the settings-redirect dialog and open the settings screen.
    fn run_settings_dialog(&mut self) -> FlowStep {
        self.state = FlowState::AwaitingSettingsDialog;
        match self.host.dialogs.confirm(self.request.settings_message()) {
            Ok(DialogChoice::Accepted) => match self.host.settings.open_app_settings() {
                Ok(()) => {
                    info!("settings screen opened");
                    self.state = FlowState::AwaitingSettingsScreen;
                    FlowStep::SettingsOpened
                }
                Err(err) => {
                    warn!(%err, "failed to open settings, treating as decline");
                    self.finish(Outcome::SomeDenied)
                }
            },
            Ok(DialogChoice::Declined) => {
                info!("settings redirect declined, cancelling request");
                self.finish(Outcome::SomeDenied)
            }
            Err(err) => {
                warn!(%err, "settings dialog failed, treating as decline");
                self.finish(Outcome::SomeDenied)
            }
        }
    }

    /// Hand the pending set to the host for an OS prompt.
    fn issue_prompt(&mut self, pending: Vec<String>) -> FlowStep {
        // A new prompt is in flight; the previous round-trip is over.
        self.session.clear_prompt_return();
        self.state = FlowState::AwaitingOsPrompt;
        FlowStep::RequestOsPrompt(pending)
    }

    /// Enter the terminal state and deliver the outcome exactly once.
    fn finish(&mut self, outcome: Outcome) -> FlowStep {
        match outcome {
            Outcome::AllGranted => info!("all capabilities granted"),
            Outcome::SomeDenied => info!("some capabilities denied"),
        }
        self.state = FlowState::Done(outcome);
        if let Some(tx) = self.outcome_tx.take() {
            // The receiver may be gone in the fire-and-forget variant.
            let _ = tx.send(outcome);
        }
        FlowStep::Finished(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::dialog::{AutoDialogHandler, RecordingDialogHandler};
    use crate::flow::host::FlowHostBuilder;
    use crate::flow::oracle::MemoryOracle;
    use crate::flow::settings::RecordingSettingsGateway;
    use capflow_api::CapabilityStatus;
    use std::sync::Arc;

    fn request(caps: &[&str]) -> CapabilityRequest {
        CapabilityRequest::new(
            caps.iter().copied(),
            "we need these capabilities",
            "enable them in system settings",
        )
        .unwrap()
    }

    fn host_with(
        oracle: Arc<MemoryOracle>,
        dialogs: Arc<RecordingDialogHandler>,
        settings: Arc<RecordingSettingsGateway>,
    ) -> FlowHost {
        FlowHost {
            oracle,
            dialogs,
            settings,
        }
    }

    #[test]
    fn test_all_granted_without_any_prompt() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::Granted);
        oracle.set_status("cap.b", CapabilityStatus::Granted);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a", "cap.b"]),
            host_with(oracle.clone(), dialogs.clone(), settings.clone()),
        );

        let step = flow.on_session_start(false);
        assert_eq!(step, FlowStep::Finished(Outcome::AllGranted));
        assert_eq!(dialogs.dialog_count(), 0);
        assert_eq!(settings.open_count(), 0);
        assert_eq!(outcome.try_recv(), Some(Outcome::AllGranted));
    }

    #[test]
    fn test_empty_request_succeeds_with_zero_oracle_queries() {
        let oracle = Arc::new(MemoryOracle::new());
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&[]),
            host_with(oracle.clone(), dialogs, settings),
        );

        let step = flow.on_session_start(false);
        assert_eq!(step, FlowStep::Finished(Outcome::AllGranted));
        assert_eq!(oracle.query_count(), 0);
        assert_eq!(outcome.try_recv(), Some(Outcome::AllGranted));
    }

    #[test]
    fn test_denied_capability_issues_os_prompt() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::Granted);
        oracle.set_status("cap.b", CapabilityStatus::DeniedCanAskAgain);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, _outcome) = PermissionFlow::start(
            request(&["cap.a", "cap.b"]),
            host_with(oracle, dialogs, settings),
        );

        let step = flow.on_session_start(false);
        assert_eq!(step, FlowStep::RequestOsPrompt(vec!["cap.b".to_string()]));
        assert_eq!(flow.state(), FlowState::AwaitingOsPrompt);
    }

    #[test]
    fn test_prompt_granting_everything_finishes() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedCanAskAgain);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs.clone(), settings),
        );

        flow.on_session_start(false);
        let step = flow.on_os_prompt_result(GrantResults::new().grant("cap.a"));
        assert_eq!(step, FlowStep::Finished(Outcome::AllGranted));
        assert_eq!(dialogs.dialog_count(), 0);
        assert_eq!(outcome.try_recv(), Some(Outcome::AllGranted));
    }

    #[test]
    fn test_denial_never_finishes_without_a_dialog() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedCanAskAgain);
        oracle.set_rationale("cap.a", true);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, _outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs.clone(), settings),
        );

        flow.on_session_start(false);
        flow.on_os_prompt_result(GrantResults::new().deny("cap.a"));
        // A dialog was consulted before the terminal state.
        assert_eq!(dialogs.dialog_count(), 1);
    }

    #[test]
    fn test_rationale_shown_once_for_combined_request() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedCanAskAgain);
        oracle.set_status("cap.b", CapabilityStatus::DeniedCanAskAgain);
        oracle.set_rationale("cap.a", true);
        oracle.set_rationale("cap.b", true);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a", "cap.b"]),
            host_with(oracle, dialogs.clone(), settings),
        );

        flow.on_session_start(false);
        let step =
            flow.on_os_prompt_result(GrantResults::new().deny("cap.a").deny("cap.b"));

        assert_eq!(step, FlowStep::Finished(Outcome::SomeDenied));
        assert_eq!(dialogs.dialog_count(), 1);
        assert_eq!(dialogs.messages()[0], "we need these capabilities");
        assert_eq!(outcome.try_recv(), Some(Outcome::SomeDenied));
    }

    #[test]
    fn test_rationale_wins_over_settings_when_mixed() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedCanAskAgain);
        oracle.set_status("cap.b", CapabilityStatus::DeniedPermanent);
        // Only cap.a qualifies for rationale; cap.b is permanently denied.
        oracle.set_rationale("cap.a", true);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, _outcome) = PermissionFlow::start(
            request(&["cap.a", "cap.b"]),
            host_with(oracle, dialogs.clone(), settings.clone()),
        );

        flow.on_session_start(false);
        flow.on_os_prompt_result(GrantResults::new().deny("cap.a").deny("cap.b"));

        assert_eq!(dialogs.messages()[0], "we need these capabilities");
        assert_eq!(settings.open_count(), 0);
    }

    #[test]
    fn test_accepting_rationale_retries_same_pending_set() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::Granted);
        oracle.set_status("cap.b", CapabilityStatus::DeniedCanAskAgain);
        oracle.set_rationale("cap.b", true);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Accepted));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, _outcome) = PermissionFlow::start(
            request(&["cap.a", "cap.b"]),
            host_with(oracle, dialogs.clone(), settings),
        );

        flow.on_session_start(false);
        let step = flow.on_os_prompt_result(GrantResults::new().deny("cap.b"));

        assert_eq!(step, FlowStep::RequestOsPrompt(vec!["cap.b".to_string()]));
        assert_eq!(flow.state(), FlowState::AwaitingOsPrompt);
        assert_eq!(dialogs.dialog_count(), 1);
    }

    #[test]
    fn test_settings_dialog_when_nothing_qualifies_for_rationale() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedPermanent);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Accepted));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, _outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs.clone(), settings.clone()),
        );

        flow.on_session_start(false);
        let step = flow.on_os_prompt_result(GrantResults::new().deny("cap.a"));

        assert_eq!(step, FlowStep::SettingsOpened);
        assert_eq!(flow.state(), FlowState::AwaitingSettingsScreen);
        assert_eq!(dialogs.messages()[0], "enable them in system settings");
        assert_eq!(settings.open_count(), 1);
    }

    #[test]
    fn test_declining_settings_dialog_denies() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedPermanent);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs, settings.clone()),
        );

        flow.on_session_start(false);
        let step = flow.on_os_prompt_result(GrantResults::new().deny("cap.a"));

        assert_eq!(step, FlowStep::Finished(Outcome::SomeDenied));
        assert_eq!(settings.open_count(), 0);
        assert_eq!(outcome.try_recv(), Some(Outcome::SomeDenied));
    }

    #[test]
    fn test_returning_from_settings_denies() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedPermanent);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Accepted));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs, settings),
        );

        flow.on_session_start(false);
        flow.on_os_prompt_result(GrantResults::new().deny("cap.a"));
        assert_eq!(flow.state(), FlowState::AwaitingSettingsScreen);

        flow.on_foreground_lost();
        let step = flow.on_foreground_regained();
        assert_eq!(step, FlowStep::Finished(Outcome::SomeDenied));
        assert_eq!(outcome.try_recv(), Some(Outcome::SomeDenied));
    }

    #[test]
    fn test_settings_open_failure_counts_as_decline() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedPermanent);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Accepted));
        let settings = Arc::new(RecordingSettingsGateway::failing());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs, settings),
        );

        flow.on_session_start(false);
        let step = flow.on_os_prompt_result(GrantResults::new().deny("cap.a"));
        assert_eq!(step, FlowStep::Finished(Outcome::SomeDenied));
        assert_eq!(outcome.try_recv(), Some(Outcome::SomeDenied));
    }

    #[test]
    fn test_restored_session_never_resumes() {
        let oracle = Arc::new(MemoryOracle::new());
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Accepted));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle.clone(), dialogs, settings),
        );

        let step = flow.on_session_start(true);
        assert_eq!(step, FlowStep::Finished(Outcome::SomeDenied));
        assert_eq!(oracle.query_count(), 0);
        assert_eq!(outcome.try_recv(), Some(Outcome::SomeDenied));
    }

    #[test]
    fn test_foreground_regained_mid_prompt_re_evaluates() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedCanAskAgain);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, mut outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle.clone(), dialogs, settings),
        );

        flow.on_session_start(false);
        assert_eq!(flow.state(), FlowState::AwaitingOsPrompt);

        // The prompt never reported back; the user granted the capability
        // elsewhere and the surface came back to foreground.
        flow.on_foreground_lost();
        oracle.set_status("cap.a", CapabilityStatus::Granted);
        let step = flow.on_foreground_regained();

        assert_eq!(step, FlowStep::Finished(Outcome::AllGranted));
        assert_eq!(outcome.try_recv(), Some(Outcome::AllGranted));
    }

    #[test]
    fn test_done_state_absorbs_further_events() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::Granted);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, _outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs, settings),
        );

        flow.on_session_start(false);
        assert!(flow.is_done());

        assert_eq!(
            flow.on_foreground_regained(),
            FlowStep::Finished(Outcome::AllGranted)
        );
        assert_eq!(
            flow.on_os_prompt_result(GrantResults::new().deny("cap.a")),
            FlowStep::Finished(Outcome::AllGranted)
        );
        assert_eq!(
            flow.on_session_start(false),
            FlowStep::Finished(Outcome::AllGranted)
        );
    }

    #[test]
    fn test_prompt_result_in_wrong_state_is_ignored() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.set_status("cap.a", CapabilityStatus::DeniedCanAskAgain);
        let dialogs = Arc::new(RecordingDialogHandler::new(DialogChoice::Declined));
        let settings = Arc::new(RecordingSettingsGateway::new());

        let (mut flow, _outcome) = PermissionFlow::start(
            request(&["cap.a"]),
            host_with(oracle, dialogs, settings),
        );

        // Result before the session even started.
        let step = flow.on_os_prompt_result(GrantResults::new().grant("cap.a"));
        assert_eq!(step, FlowStep::Pending);
        assert_eq!(flow.state(), FlowState::Idle);
    }
}
