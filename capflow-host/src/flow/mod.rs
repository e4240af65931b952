//! Permission request flow
//!
//! This module implements a reusable policy for requesting a set of runtime
//! capabilities from an end user: ask the OS, explain the request when the
//! platform says the user previously declined, and redirect to the system
//! settings screen when a capability is permanently denied. The host wires
//! in three collaborators and drives the flow with lifecycle events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        PermissionFlow                            │
//! │  ┌──────────────┐ ┌───────────────┐ ┌─────────────────────────┐ │
//! │  │    Oracle    │ │    Dialogs    │ │        Settings         │ │
//! │  │              │ │               │ │                         │ │
//! │  │ - Memory     │ │ - Terminal    │ │ - Unsupported           │ │
//! │  │ - (platform) │ │ - Auto        │ │ - Recording             │ │
//! │  │              │ │ - Recording   │ │ - (platform)            │ │
//! │  └──────────────┘ └───────────────┘ └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use capflow_api::{CapabilityRequest, CapabilityStatus, GrantResults};
//! use capflow_host::flow::{
//!     AutoDialogHandler, FlowHostBuilder, FlowStep, MemoryOracle, PermissionFlow,
//! };
//!
//! let oracle = MemoryOracle::new();
//! oracle.set_status("cap.location", CapabilityStatus::DeniedCanAskAgain);
//!
//! let host = FlowHostBuilder::new()
//!     .oracle(oracle)
//!     .dialogs(AutoDialogHandler::always_decline())
//!     .build()
//!     .unwrap();
//!
//! let request = CapabilityRequest::new(
//!     ["cap.location"],
//!     "Location is used to tag your notes",
//!     "Enable location access in system settings",
//! )
//! .unwrap();
//!
//! let (mut flow, outcome) = PermissionFlow::start(request, host);
//! let step = flow.on_session_start(false);
//! assert!(matches!(step, FlowStep::RequestOsPrompt(_)));
//!
//! // The host shows the OS prompt and reports what the user decided.
//! flow.on_os_prompt_result(GrantResults::new().grant("cap.location"));
//! assert!(outcome.blocking_recv().unwrap().is_granted());
//! ```
//!
//! # Components
//!
//! ## Oracle
//!
//! Read-only query surface over the platform's grant state: per-capability
//! status plus the "should show rationale" heuristic. The flow treats the
//! platform's answers as ground truth.
//!
//! ## Dialogs
//!
//! Two-button confirmation surface, one dialog per request (never one per
//! capability). Dismissing a dialog counts as declining it.
//!
//! ## Settings
//!
//! Capability-agnostic "open the OS settings page for this app" action.
//! A visit to the settings screen ends the session: grant changes made
//! there are not synchronously observable, so the flow reports
//! `SomeDenied` and lets the caller start over.

pub mod dialog;
pub mod host;
pub mod oracle;
pub mod orchestrator;
pub mod session;
pub mod settings;

// Re-exports for convenience
pub use dialog::{AutoDialogHandler, RecordingDialogHandler, TerminalDialogHandler};
pub use dialog::{DialogChoice, DialogError, DialogHandler};
pub use host::{FlowHost, FlowHostBuilder, HostBuildError};
pub use oracle::{CapabilityOracle, MemoryOracle};
pub use orchestrator::{FlowStep, OutcomeReceiver, PermissionFlow};
pub use session::{FlowState, RequestSession};
pub use settings::{
    RecordingSettingsGateway, SettingsError, SettingsGateway, UnsupportedSettingsGateway,
};
