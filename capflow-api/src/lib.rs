//! capflow-api: Shared types for the capflow permission-request flow
//!
//! This crate defines the values exchanged between the request orchestrator
//! and the host embedding it: per-capability grant statuses reported by the
//! platform, the immutable request description, OS prompt results, and the
//! terminal outcome of a session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grant state of a single capability, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    /// The capability is currently granted.
    Granted,
    /// Denied, but the OS will show a prompt if asked again.
    DeniedCanAskAgain,
    /// Denied and the user has blocked further prompts; only the system
    /// settings screen can change this.
    DeniedPermanent,
}

impl CapabilityStatus {
    /// Check whether this status counts as granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Error type for caller contract violations
///
/// These are raised synchronously when a request is constructed, before any
/// session state exists.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Rationale message can not be empty")]
    EmptyRationaleMessage,

    #[error("Settings message can not be empty")]
    EmptySettingsMessage,
}

/// Immutable description of one permission request
///
/// Holds the ordered capability identifiers plus the two user-facing
/// messages: the rationale shown when the OS reports the user previously
/// declined, and the redirect text shown when only the settings screen can
/// help. Created once at request start and never mutated.
///
/// An empty capability list is valid and short-circuits the session to
/// [`Outcome::AllGranted`]; blank messages are a caller error and are
/// rejected here, before any state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRequest {
    capabilities: Vec<String>,
    rationale_message: String,
    settings_message: String,
}

impl CapabilityRequest {
    /// Create a new request, validating the caller contract.
    pub fn new(
        capabilities: impl IntoIterator<Item = impl Into<String>>,
        rationale_message: impl Into<String>,
        settings_message: impl Into<String>,
    ) -> Result<Self, ContractError> {
        let rationale_message = rationale_message.into();
        let settings_message = settings_message.into();

        if rationale_message.trim().is_empty() {
            return Err(ContractError::EmptyRationaleMessage);
        }
        if settings_message.trim().is_empty() {
            return Err(ContractError::EmptySettingsMessage);
        }

        Ok(Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            rationale_message,
            settings_message,
        })
    }

    /// The requested capability identifiers, in request order.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Message shown when the platform asks for a rationale.
    pub fn rationale_message(&self) -> &str {
        &self.rationale_message
    }

    /// Message shown when redirecting the user to the settings screen.
    pub fn settings_message(&self) -> &str {
        &self.settings_message
    }

    /// True when no capabilities were requested.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Check whether an identifier belongs to this request.
    pub fn contains(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Result of one OS permission prompt
///
/// Maps each prompted capability identifier to a granted flag, preserving
/// prompt order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantResults {
    entries: Vec<(String, bool)>,
}

impl GrantResults {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a capability as granted (builder style).
    pub fn grant(mut self, capability: impl Into<String>) -> Self {
        self.push(capability, true);
        self
    }

    /// Record a capability as denied (builder style).
    pub fn deny(mut self, capability: impl Into<String>) -> Self {
        self.push(capability, false);
        self
    }

    /// Append one result entry.
    pub fn push(&mut self, capability: impl Into<String>, granted: bool) {
        self.entries.push((capability.into(), granted));
    }

    /// True when every reported capability was granted.
    ///
    /// An empty result set counts as all-granted.
    pub fn granted_all(&self) -> bool {
        self.entries.iter().all(|(_, granted)| *granted)
    }

    /// The denied capability identifiers, in prompt order.
    pub fn denied(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, granted)| !granted)
            .map(|(capability, _)| capability.as_str())
            .collect()
    }

    /// Number of reported capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no results were reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(identifier, granted)` entries in prompt order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries
            .iter()
            .map(|(capability, granted)| (capability.as_str(), *granted))
    }
}

/// Terminal outcome of a permission-request session
///
/// Produced exactly once per session. The caller only ever sees this
/// aggregate; there is no per-capability outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every requested capability is granted.
    AllGranted,
    /// At least one capability remains denied.
    SomeDenied,
}

impl Outcome {
    /// Check whether the session ended with every capability granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::AllGranted)
    }
}
