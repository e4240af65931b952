//! Host collaborator bundle
//!
//! Groups the three collaborators a flow consumes — oracle, dialogs,
//! settings gateway — and provides a builder with sensible defaults for
//! everything but the oracle, which has no portable default.

use std::sync::Arc;
use thiserror::Error;

use super::dialog::{DialogHandler, TerminalDialogHandler};
use super::oracle::CapabilityOracle;
use super::settings::{SettingsGateway, UnsupportedSettingsGateway};

/// Error type for host bundle construction
#[derive(Debug, Error)]
pub enum HostBuildError {
    #[error("A capability oracle is required")]
    MissingOracle,
}

/// Complete collaborator bundle for one or more flows
pub struct FlowHost {
    /// Grant-state query surface.
    pub oracle: Arc<dyn CapabilityOracle>,
    /// Two-button dialog surface.
    pub dialogs: Arc<dyn DialogHandler>,
    /// Settings screen opener.
    pub settings: Arc<dyn SettingsGateway>,
}

impl std::fmt::Debug for FlowHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowHost").finish_non_exhaustive()
    }
}

impl FlowHost {
    /// Create a bundle from custom components.
    pub fn new(
        oracle: impl CapabilityOracle + 'static,
        dialogs: impl DialogHandler + 'static,
        settings: impl SettingsGateway + 'static,
    ) -> Self {
        Self {
            oracle: Arc::new(oracle),
            dialogs: Arc::new(dialogs),
            settings: Arc::new(settings),
        }
    }
}

/// Builder for [`FlowHost`] bundles
pub struct FlowHostBuilder {
    oracle: Option<Arc<dyn CapabilityOracle>>,
    dialogs: Option<Arc<dyn DialogHandler>>,
    settings: Option<Arc<dyn SettingsGateway>>,
}

impl FlowHostBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            oracle: None,
            dialogs: None,
            settings: None,
        }
    }

    /// Set the capability oracle (required).
    pub fn oracle(mut self, oracle: impl CapabilityOracle + 'static) -> Self {
        self.oracle = Some(Arc::new(oracle));
        self
    }

    /// Set the dialog handler.
    pub fn dialogs(mut self, dialogs: impl DialogHandler + 'static) -> Self {
        self.dialogs = Some(Arc::new(dialogs));
        self
    }

    /// Set the settings gateway.
    pub fn settings(mut self, settings: impl SettingsGateway + 'static) -> Self {
        self.settings = Some(Arc::new(settings));
        self
    }

    /// Build the bundle.
    ///
    /// Defaults: terminal dialogs, unsupported settings gateway. The oracle
    /// must always be supplied.
    pub fn build(self) -> Result<FlowHost, HostBuildError> {
        let oracle = self.oracle.ok_or(HostBuildError::MissingOracle)?;

        Ok(FlowHost {
            oracle,
            dialogs: self
                .dialogs
                .unwrap_or_else(|| Arc::new(TerminalDialogHandler::new())),
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(UnsupportedSettingsGateway)),
        })
    }
}

impl Default for FlowHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::oracle::MemoryOracle;

    #[test]
    fn test_builder_requires_oracle() {
        assert!(matches!(
            FlowHostBuilder::new().build(),
            Err(HostBuildError::MissingOracle)
        ));
    }

    #[test]
    fn test_builder_applies_defaults() {
        let host = FlowHostBuilder::new()
            .oracle(MemoryOracle::new())
            .build()
            .unwrap();
        // Default settings gateway is the portable one that always fails.
        assert!(host.settings.open_app_settings().is_err());
    }
}
